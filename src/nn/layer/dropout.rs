/*
 * @Author       : 老董
 * @Date         : 2026-07-15
 * @Description  : 按通道随机丢弃（inverted dropout）
 *
 * 对每个 (样本, 通道) 独立采样一个 Bernoulli 掩码：以 dropout_rate 的概率
 * 把整条通道置零，保留的通道按 1/(1-rate) 放大，使期望不变。
 * 仅训练模式生效；推理模式与 rate=0 时为恒等映射。
 */

use ndarray::Array2;
use rand::Rng;
use rand::rngs::StdRng;

use crate::nn::{FeatureMap, NetError};

/// 按通道 dropout 层
pub struct ChannelDropout {
    rate: f32,
    /// 层自有的 RNG（由构建方的种子派生，保证可复现）
    rng: StdRng,
    /// 反向传播缓存：[batch, channels] 的缩放掩码（0 或 1/(1-rate)）
    mask: Option<Array2<f32>>,
}

impl ChannelDropout {
    pub fn new(rate: f32, rng: StdRng) -> Result<Self, NetError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(NetError::InvalidConfig(format!(
                "dropout_rate 必须在 [0, 1) 内，得到 {rate}"
            )));
        }
        Ok(Self {
            rate,
            rng,
            mask: None,
        })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// 前向传播
    pub fn forward(&mut self, x: &FeatureMap, training: bool) -> FeatureMap {
        if !training || self.rate == 0.0 {
            self.mask = None;
            return x.clone();
        }

        let (batch, h, w, c) = x.dim();
        let keep_scale = 1.0 / (1.0 - self.rate);
        let mask = Array2::from_shape_fn((batch, c), |_| {
            if self.rng.r#gen::<f32>() < self.rate {
                0.0
            } else {
                keep_scale
            }
        });

        let mut output = x.clone();
        for b in 0..batch {
            for ch in 0..c {
                let m = mask[[b, ch]];
                for i in 0..h {
                    for j in 0..w {
                        output[[b, i, j, ch]] *= m;
                    }
                }
            }
        }

        self.mask = Some(mask);
        output
    }

    /// 反向传播：梯度乘以前向用过的掩码
    pub fn backward(&mut self, grad_out: &FeatureMap) -> Result<FeatureMap, NetError> {
        match self.mask.take() {
            // 推理模式或 rate=0 的前向之后：恒等
            None => Ok(grad_out.clone()),
            Some(mask) => {
                let (batch, h, w, c) = grad_out.dim();
                let mut grad = grad_out.clone();
                for b in 0..batch {
                    for ch in 0..c {
                        let m = mask[[b, ch]];
                        for i in 0..h {
                            for j in 0..w {
                                grad[[b, i, j, ch]] *= m;
                            }
                        }
                    }
                }
                Ok(grad)
            }
        }
    }
}
