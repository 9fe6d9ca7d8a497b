/*
 * @Author       : 老董
 * @Date         : 2026-07-16
 * @Description  : Dense 块：单元层的生长式拼接
 *
 * 密集连接的定义性质：第 i 个单元看到的是此前全部输出在通道轴上的拼接
 * （从早到晚的顺序），而不是单一残差流。每过一个单元，
 * 特征图通道数增加 growth_rate。
 */

use ndarray::{Axis, concatenate, s};
use rand::rngs::StdRng;

use crate::nn::layer::{UnitHyper, UnitLayer};
use crate::nn::{FeatureMap, NetError, ParamStore, RegularizationPool};

/// Dense 块
///
/// 输出通道数 = `in_channels + depth * growth_rate`；depth = 0 时是恒等映射。
pub struct DenseBlock {
    units: Vec<UnitLayer>,
    in_channels: usize,
    growth_rate: usize,
}

impl DenseBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
        name: &str,
        in_channels: usize,
        depth: usize,
        growth_rate: usize,
        hyper: UnitHyper,
        rng: &mut StdRng,
        drop_seed: u64,
    ) -> Result<Self, NetError> {
        use rand::SeedableRng;

        let mut units = Vec::with_capacity(depth);
        for i in 0..depth {
            // 第 i 个单元的输入是原始输入加上前 i 个单元的输出
            let unit_in = in_channels + i * growth_rate;
            units.push(UnitLayer::new(
                store,
                pool,
                &format!("{name}/unit{i}"),
                unit_in,
                growth_rate,
                hyper,
                rng,
                StdRng::seed_from_u64(drop_seed.wrapping_add(i as u64)),
            )?);
        }
        Ok(Self {
            units,
            in_channels,
            growth_rate,
        })
    }

    /// 块内单元数
    pub fn depth(&self) -> usize {
        self.units.len()
    }

    /// 输出通道数
    pub fn out_channels(&self) -> usize {
        self.in_channels + self.units.len() * self.growth_rate
    }

    /// 前向传播：逐单元计算并在通道轴拼接
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &FeatureMap,
        training: bool,
    ) -> Result<FeatureMap, NetError> {
        let mut features = x.clone();
        for unit in &mut self.units {
            let unit_out = unit.forward(store, &features, training)?;
            // 新特征拼在末尾，保持从早到晚的通道顺序
            features = concatenate(Axis(3), &[features.view(), unit_out.view()])
                .expect("dense 块拼接失败");
        }
        Ok(features)
    }

    /// 反向传播
    ///
    /// 逆序处理各单元：把输出梯度拆成「前缀拼接」与「该单元输出」两段，
    /// 单元的输入梯度再累加回前缀段。
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &FeatureMap,
    ) -> Result<FeatureMap, NetError> {
        let mut grad = grad_out.clone();
        for unit in self.units.iter_mut().rev() {
            let channels = grad.shape()[3];
            let split = channels - self.growth_rate;
            let grad_unit = grad.slice(s![.., .., .., split..]).to_owned();
            let mut grad_prefix = grad.slice(s![.., .., .., ..split]).to_owned();

            let grad_input = unit.backward(store, &grad_unit)?;
            grad_prefix += &grad_input;
            grad = grad_prefix;
        }
        Ok(grad)
    }
}
