/*
 * @Author       : 老董
 * @Date         : 2026-07-15
 * @Description  : 按通道批归一化（NHWC）
 *
 * 训练模式：用本 batch 在 (batch, H, W) 上的统计量归一化，并以
 *   running = momentum * running + (1 - momentum) * batch
 * 更新滑动统计量（这是前向传播的副作用，属于同一逻辑训练步）。
 * 推理模式：用滑动统计量归一化，不改动参数与统计量，并作废训练缓存。
 *
 * gamma/beta 是可训练参数（不做 L2 正则），滑动统计量不可训练。
 */

use ndarray::{Array1, Array4, Axis};
use rand::rngs::StdRng;

use crate::nn::{FeatureMap, Init, NetError, ParamId, ParamStore};

/// 数值稳定项（TF `tf.layers.batch_normalization` 的默认值）
const BN_EPSILON: f32 = 1e-3;

/// 按通道批归一化层
pub struct BatchNorm {
    /// 缩放参数 [C]，初始为 1
    gamma: ParamId,
    /// 平移参数 [C]，初始为 0
    beta: ParamId,
    channels: usize,
    momentum: f32,
    /// 滑动均值，初始为 0
    running_mean: Array1<f32>,
    /// 滑动方差，初始为 1
    running_var: Array1<f32>,
    /// 反向传播缓存（仅训练模式前向会写入）
    cache: Option<BnCache>,
}

struct BnCache {
    /// 归一化后的 x_hat
    normalized: Array4<f32>,
    /// 每通道的 sqrt(var + eps)
    std: Array1<f32>,
}

impl BatchNorm {
    pub fn new(
        store: &mut ParamStore,
        name: &str,
        channels: usize,
        momentum: f32,
        rng: &mut StdRng,
    ) -> Result<Self, NetError> {
        let gamma = store.register(&format!("{name}/gamma"), &[channels], Init::Ones, rng)?;
        let beta = store.register(&format!("{name}/beta"), &[channels], Init::Zeros, rng)?;
        Ok(Self {
            gamma,
            beta,
            channels,
            momentum,
            running_mean: Array1::zeros(channels),
            running_var: Array1::ones(channels),
            cache: None,
        })
    }

    /// 缩放参数句柄
    pub fn gamma(&self) -> ParamId {
        self.gamma
    }

    /// 平移参数句柄
    pub fn beta(&self) -> ParamId {
        self.beta
    }

    pub fn running_mean(&self) -> &Array1<f32> {
        &self.running_mean
    }

    pub fn running_var(&self) -> &Array1<f32> {
        &self.running_var
    }

    /// 前向传播
    ///
    /// `training = true` 时更新滑动统计量并缓存反向所需中间量；
    /// `training = false` 时不改动参数与统计量，只清掉既有的训练缓存。
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &FeatureMap,
        training: bool,
    ) -> Result<FeatureMap, NetError> {
        let (batch, h, w, c) = x.dim();
        if c != self.channels {
            return Err(NetError::ShapeMismatch {
                expected: vec![batch, h, w, self.channels],
                got: x.shape().to_vec(),
                message: "批归一化的通道数不匹配".to_string(),
            });
        }

        let gamma = store.value(self.gamma);
        let beta = store.value(self.beta);
        let n = (batch * h * w) as f32;

        let (mean, var) = if training {
            // 本 batch 的按通道统计量
            let mut mean = Array1::<f32>::zeros(c);
            let mut var = Array1::<f32>::zeros(c);
            for ch in 0..c {
                let lane = x.index_axis(Axis(3), ch);
                let m = lane.sum() / n;
                mean[ch] = m;
                var[ch] = lane.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / n;
            }

            // 滑动统计量更新（训练步的副作用）
            for ch in 0..c {
                self.running_mean[ch] =
                    self.momentum * self.running_mean[ch] + (1.0 - self.momentum) * mean[ch];
                self.running_var[ch] =
                    self.momentum * self.running_var[ch] + (1.0 - self.momentum) * var[ch];
            }
            (mean, var)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let std = var.mapv(|v| (v + BN_EPSILON).sqrt());

        let mut normalized = Array4::<f32>::zeros((batch, h, w, c));
        let mut output = Array4::<f32>::zeros((batch, h, w, c));
        for ch in 0..c {
            let (m, s) = (mean[ch], std[ch]);
            let (g, b) = (gamma[[ch]], beta[[ch]]);
            let lane = x.index_axis(Axis(3), ch);
            let mut norm_lane = normalized.index_axis_mut(Axis(3), ch);
            let mut out_lane = output.index_axis_mut(Axis(3), ch);
            ndarray::Zip::from(&mut norm_lane)
                .and(&mut out_lane)
                .and(&lane)
                .for_each(|nv, ov, &xv| {
                    *nv = (xv - m) / s;
                    *ov = g * *nv + b;
                });
        }

        if training {
            self.cache = Some(BnCache { normalized, std });
        } else {
            // 推理前向使此前的训练缓存失效
            self.cache = None;
        }
        Ok(output)
    }

    /// 反向传播（只对训练模式的前向有效）
    ///
    /// 返回对输入的梯度，并把 gamma/beta 的梯度累加进仓库。
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &FeatureMap,
    ) -> Result<FeatureMap, NetError> {
        let cache = self.cache.take().ok_or_else(|| {
            NetError::ComputationError(
                "批归一化反向传播前必须先执行训练模式前向传播".to_string(),
            )
        })?;

        let (batch, h, w, c) = grad_out.dim();
        let n = (batch * h * w) as f32;
        let gamma = store.value(self.gamma).clone();

        let mut grad_gamma = Array1::<f32>::zeros(c);
        let mut grad_beta = Array1::<f32>::zeros(c);
        let mut grad_input = Array4::<f32>::zeros((batch, h, w, c));

        for ch in 0..c {
            let g_lane = grad_out.index_axis(Axis(3), ch);
            let x_hat = cache.normalized.index_axis(Axis(3), ch);

            let sum_g = g_lane.sum();
            let sum_g_xhat = ndarray::Zip::from(&g_lane)
                .and(&x_hat)
                .fold(0.0, |acc, &g, &xh| acc + g * xh);

            grad_beta[ch] = sum_g;
            grad_gamma[ch] = sum_g_xhat;

            // dx = gamma / std * (dy - mean(dy) - x_hat * mean(dy * x_hat))
            let scale = gamma[[ch]] / cache.std[ch];
            let (mean_g, mean_g_xhat) = (sum_g / n, sum_g_xhat / n);
            let mut gi_lane = grad_input.index_axis_mut(Axis(3), ch);
            ndarray::Zip::from(&mut gi_lane)
                .and(&g_lane)
                .and(&x_hat)
                .for_each(|gi, &g, &xh| {
                    *gi = scale * (g - mean_g - xh * mean_g_xhat);
                });
        }

        *store.grad_mut(self.gamma) += &grad_gamma.into_dyn();
        *store.grad_mut(self.beta) += &grad_beta.into_dyn();
        Ok(grad_input)
    }
}
