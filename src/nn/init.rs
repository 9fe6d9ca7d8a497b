/*
 * @Author       : 老董
 * @Date         : 2026-07-12
 * @Description  : 参数初始化方式
 */

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand::rngs::StdRng;

/// 参数初始化方式
///
/// 网络中只用到两种：卷积核/全连接权重取小标准差的零均值正态分布，
/// 偏置与 BatchNorm 的 beta 取全零，gamma 取全一。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// 正态分布 N(0, std)
    Normal { std: f32 },
}

impl Init {
    /// 用指定的 RNG 生成初始化后的张量
    pub fn generate_with_rng(&self, shape: &[usize], rng: &mut StdRng) -> ArrayD<f32> {
        match self {
            Self::Zeros => ArrayD::zeros(IxDyn(shape)),
            Self::Ones => ArrayD::ones(IxDyn(shape)),
            Self::Normal { std } => normal_with_rng(0.0, *std, shape, rng),
        }
    }
}

/// 生成服从 N(mean, std_dev) 的随机张量（Box–Muller 变换）
pub fn normal_with_rng(mean: f32, std_dev: f32, shape: &[usize], rng: &mut StdRng) -> ArrayD<f32> {
    let data_len = shape.iter().product::<usize>();
    let mut data = Vec::with_capacity(data_len);

    while data.len() < data_len {
        let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = rng.r#gen();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f32::consts::PI * u2;
        let z0 = mean + std_dev * r * theta.cos();
        let z1 = mean + std_dev * r * theta.sin();

        if z0.is_finite() {
            data.push(z0);
        }
        if data.len() < data_len && z1.is_finite() {
            data.push(z1);
        }
    }

    ArrayD::from_shape_vec(IxDyn(shape), data).unwrap()
}
