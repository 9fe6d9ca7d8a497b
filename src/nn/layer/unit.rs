/*
 * @Author       : 老董
 * @Date         : 2026-07-16
 * @Description  : 密集连接的原子单元：BN → ReLU → 3x3 卷积 → 按通道 dropout
 *
 * 输出与输入同高宽，通道数为构建时指定的 out_channels
 * （dense 块内为 growth_rate，过渡层内等于输入通道数）。
 */

use ndarray::Array4;
use rand::rngs::StdRng;

use crate::nn::layer::{BatchNorm, ChannelDropout, Conv2d};
use crate::nn::{FeatureMap, NetError, ParamStore, RegularizationPool};

/// 单元层超参数（由装配器统一下发）
#[derive(Debug, Clone, Copy)]
pub struct UnitHyper {
    pub bn_momentum: f32,
    pub dropout_rate: f32,
    pub weight_decay: f32,
}

/// 密集连接单元层
pub struct UnitLayer {
    bn: BatchNorm,
    conv: Conv2d,
    drop: ChannelDropout,
    /// 反向传播缓存：ReLU 的通过掩码
    relu_mask: Option<Array4<f32>>,
}

impl UnitLayer {
    pub fn new(
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
        name: &str,
        in_channels: usize,
        out_channels: usize,
        hyper: UnitHyper,
        rng: &mut StdRng,
        drop_rng: StdRng,
    ) -> Result<Self, NetError> {
        let bn = BatchNorm::new(
            store,
            &format!("{name}/bn"),
            in_channels,
            hyper.bn_momentum,
            rng,
        )?;
        let conv = Conv2d::new(
            store,
            pool,
            &format!("{name}/conv"),
            in_channels,
            out_channels,
            3,
            1,
            hyper.weight_decay,
            rng,
        )?;
        let drop = ChannelDropout::new(hyper.dropout_rate, drop_rng)?;
        Ok(Self {
            bn,
            conv,
            drop,
            relu_mask: None,
        })
    }

    pub fn out_channels(&self) -> usize {
        self.conv.out_channels()
    }

    pub fn batch_norm(&self) -> &BatchNorm {
        &self.bn
    }

    /// 前向传播：BN → ReLU → conv → dropout
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &FeatureMap,
        training: bool,
    ) -> Result<FeatureMap, NetError> {
        let normalized = self.bn.forward(store, x, training)?;

        // ReLU：负值截断为 0，掩码留给反向传播
        let mask = normalized.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let activated = &normalized * &mask;
        self.relu_mask = if training { Some(mask) } else { None };

        let conv_out = self.conv.forward(store, &activated, training)?;
        Ok(self.drop.forward(&conv_out, training))
    }

    /// 反向传播，返回对输入的梯度
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &FeatureMap,
    ) -> Result<FeatureMap, NetError> {
        let grad = self.drop.backward(grad_out)?;
        let grad = self.conv.backward(store, &grad)?;
        let mask = self.relu_mask.take().ok_or_else(|| {
            NetError::ComputationError(
                "单元层反向传播前必须先执行训练模式前向传播".to_string(),
            )
        })?;
        let grad = &grad * &mask;
        self.bn.backward(store, &grad)
    }
}
