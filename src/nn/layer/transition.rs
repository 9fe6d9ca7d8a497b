/*
 * @Author       : 老董
 * @Date         : 2026-07-16
 * @Description  : 过渡层：不增长的单元层 + 2x2 平均池化
 *
 * 压缩而非扩张：单元层的输出通道数等于输入通道数，随后高宽各减半。
 * 输入高宽必须能被 2 整除，否则在首次前向时显式失败。
 */

use rand::rngs::StdRng;

use crate::nn::layer::{UnitHyper, UnitLayer, avg_pool2d_2x2, avg_pool2d_2x2_backward};
use crate::nn::{FeatureMap, NetError, ParamStore, RegularizationPool};

/// 过渡层
pub struct TransitionLayer {
    unit: UnitLayer,
}

impl TransitionLayer {
    pub fn new(
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
        name: &str,
        channels: usize,
        hyper: UnitHyper,
        rng: &mut StdRng,
        drop_rng: StdRng,
    ) -> Result<Self, NetError> {
        // "无增长"单元：out_channels = in_channels
        let unit = UnitLayer::new(
            store,
            pool,
            &format!("{name}/unit"),
            channels,
            channels,
            hyper,
            rng,
            drop_rng,
        )?;
        Ok(Self { unit })
    }

    pub fn channels(&self) -> usize {
        self.unit.out_channels()
    }

    #[cfg(test)]
    pub(crate) fn unit(&self) -> &UnitLayer {
        &self.unit
    }

    /// 前向传播：单元层 → 2x2 平均池化（高宽减半）
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &FeatureMap,
        training: bool,
    ) -> Result<FeatureMap, NetError> {
        let unit_out = self.unit.forward(store, x, training)?;
        avg_pool2d_2x2(&unit_out)
    }

    /// 反向传播
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &FeatureMap,
    ) -> Result<FeatureMap, NetError> {
        let grad = avg_pool2d_2x2_backward(grad_out);
        self.unit.backward(store, &grad)
    }
}
