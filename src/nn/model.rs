/*
 * @Author       : 老董
 * @Date         : 2026-07-18
 * @Description  : DenseNet 装配器
 *
 * 端到端推理图：
 *   3x3 卷积(16 通道) → 3 × (dense 块 → 过渡层) → BN → ReLU
 *   → 全局平均池化 → 全连接分类头
 *
 * training 标志是显式参数，统一贯穿同一次前向中的每个归一化与 dropout，
 * 绝不允许层间取值分叉。
 */

use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::TrainConfig;
use crate::nn::layer::{
    BatchNorm, Conv2d, DenseBlock, Linear, TransitionLayer, UnitHyper, global_avg_pool,
    global_avg_pool_backward,
};
use crate::nn::{FeatureMap, Logits, NetError, ParamStore, RegularizationPool};

/// 初始卷积的输出通道数
const STEM_CHANNELS: usize = 16;

/// 把总深度拆成三个 dense 阶段的单元数
///
/// `first = second = (depth - 4) / 3`，`third` 取余下部分，
/// 恒有 `4 + first + second + third == depth`。
///
/// # 错误
/// `depth < 4` 时返回 `InvalidDepth`。
pub fn stage_depths(depth: usize) -> Result<(usize, usize, usize), NetError> {
    if depth < 4 {
        return Err(NetError::InvalidDepth(depth));
    }
    let first = (depth - 4) / 3;
    let second = first;
    let third = depth - 4 - first - second;
    Ok((first, second, third))
}

/// DenseNet 网络
///
/// 参数登记在外部传入的 `ParamStore`，正则项登记在外部传入的
/// `RegularizationPool`——两个独立网络各用各的仓库与池，账目互不污染。
pub struct DenseNet {
    conv0: Conv2d,
    stages: Vec<(DenseBlock, TransitionLayer)>,
    final_bn: BatchNorm,
    fc: Linear,
    num_classes: usize,
    /// 反向传播缓存：最后一个 ReLU 的掩码
    relu_mask: Option<FeatureMap>,
    /// 反向传播缓存：全局池化前的空间尺寸
    pooled_from: Option<(usize, usize)>,
}

impl DenseNet {
    /// 按配置装配网络并登记全部参数
    ///
    /// # 错误
    /// 配置校验失败（`depth < 4` 等）时返回配置错误，不会登记任何参数。
    pub fn new(
        config: &TrainConfig,
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
    ) -> Result<Self, NetError> {
        config.validate()?;
        let (first, second, third) = stage_depths(config.depth)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let hyper = UnitHyper {
            bn_momentum: config.bn_momentum,
            dropout_rate: config.dropout_rate,
            weight_decay: config.weight_decay,
        };

        let conv0 = Conv2d::new(
            store,
            pool,
            "conv0",
            3,
            STEM_CHANNELS,
            3,
            1,
            config.weight_decay,
            &mut rng,
        )?;

        let mut stages = Vec::with_capacity(3);
        let mut channels = STEM_CHANNELS;
        for (i, stage_depth) in [first, second, third].into_iter().enumerate() {
            let name = format!("dense{}", i + 1);
            let block = DenseBlock::new(
                store,
                pool,
                &name,
                channels,
                stage_depth,
                config.growth_rate,
                hyper,
                &mut rng,
                config.seed.wrapping_add(1000 * (i as u64 + 1)),
            )?;
            channels = block.out_channels();
            let transition = TransitionLayer::new(
                store,
                pool,
                &name,
                channels,
                hyper,
                &mut rng,
                StdRng::seed_from_u64(config.seed.wrapping_add(2000 * (i as u64 + 1))),
            )?;
            stages.push((block, transition));
        }

        let final_bn = BatchNorm::new(store, "last/bn", channels, config.bn_momentum, &mut rng)?;
        let fc = Linear::new(
            store,
            pool,
            "softmax_linear",
            channels,
            config.num_classes,
            config.weight_decay,
            &mut rng,
        )?;

        Ok(Self {
            conv0,
            stages,
            final_bn,
            fc,
            num_classes: config.num_classes,
            relu_mask: None,
            pooled_from: None,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// 全局池化前的特征维（即分类头的输入维）
    pub fn feature_dim(&self) -> usize {
        self.fc.in_features()
    }

    /// 最后一个过渡层（测试观察滑动统计量用）
    #[cfg(test)]
    pub(crate) fn last_transition(&self) -> &TransitionLayer {
        &self.stages.last().expect("网络固定有 3 个阶段").1
    }

    /// 前向传播，产出 [batch, num_classes] 的 logits
    ///
    /// `training` 统一传给每个 BN 与 dropout；推理模式不改动参数与滑动
    /// 统计量，并作废所有训练缓存（之后的 `backward` 会显式报错）。
    pub fn forward(
        &mut self,
        store: &ParamStore,
        images: &FeatureMap,
        training: bool,
    ) -> Result<Logits, NetError> {
        let mut features = self.conv0.forward(store, images, training)?;
        for (block, transition) in &mut self.stages {
            features = block.forward(store, &features, training)?;
            features = transition.forward(store, &features, training)?;
        }

        let normalized = self.final_bn.forward(store, &features, training)?;
        let mask = normalized.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let activated = &normalized * &mask;

        let (_, h, w, _) = activated.dim();
        let pooled = global_avg_pool(&activated);

        if training {
            self.relu_mask = Some(mask);
            self.pooled_from = Some((h, w));
        } else {
            // 推理前向统一作废训练缓存：之后的 backward 报错而非混用两个 batch
            self.relu_mask = None;
            self.pooled_from = None;
        }
        self.fc.forward(store, &pooled, training)
    }

    /// 反向传播：从 logits 梯度一路传回输入端，参数梯度累加进仓库
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_logits: &Array2<f32>,
    ) -> Result<(), NetError> {
        let (h, w) = self.pooled_from.take().ok_or_else(|| {
            NetError::ComputationError(
                "网络反向传播前必须先执行训练模式前向传播".to_string(),
            )
        })?;
        let mask = self.relu_mask.take().expect("前向缓存成对写入");

        let grad_pooled = self.fc.backward(store, grad_logits)?;
        let grad_activated = global_avg_pool_backward(&grad_pooled, h, w);
        let grad_normalized = &grad_activated * &mask;
        let mut grad = self.final_bn.backward(store, &grad_normalized)?;

        for (block, transition) in self.stages.iter_mut().rev() {
            grad = transition.backward(store, &grad)?;
            grad = block.backward(store, &grad)?;
        }
        self.conv0.backward(store, &grad)?;
        Ok(())
    }
}
