/*
 * @Author       : 老董
 * @Date         : 2026-07-12
 * @Description  : 训练配置（对应原脚本的 FLAGS）
 */

use crate::nn::NetError;

/// 训练配置
///
/// 默认值取自经典 CIFAR-10 DenseNet 设置：depth=40、growth_rate=12、
/// 学习率在第 150/225 个 epoch 处分段衰减。
///
/// # 使用示例
/// ```
/// use dense_torch::config::TrainConfig;
///
/// let config = TrainConfig {
///     depth: 22,
///     ..TrainConfig::default()
/// };
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// 每个 batch 的样本数（固定所有张量的第一维）
    pub batch_size: usize,
    /// 是否对输入使用低精度（f16 往返量化），参数仍为 f32
    pub use_low_precision: bool,
    /// BatchNorm 滑动统计量的动量
    pub bn_momentum: f32,
    /// L2 正则系数（在每个参数创建处登记）
    pub weight_decay: f32,
    /// 网络总深度：三个 dense 阶段的单元数 + 4 个固定层
    pub depth: usize,
    /// 增长率：每个 dense 单元新增的通道数
    pub growth_rate: usize,
    /// 卷积后按通道丢弃的概率，仅训练模式生效
    pub dropout_rate: f32,
    /// 学习率分段边界（epoch 单位，严格递增）
    pub lr_boundaries: Vec<f32>,
    /// 学习率取值，长度须为 `lr_boundaries.len() + 1`
    pub lr_values: Vec<f32>,
    /// 类别数
    pub num_classes: usize,
    /// 输入图像边长（方形）
    pub image_size: usize,
    /// 每个 epoch 的训练样本数（用于把 global_step 折算成 epoch）
    pub examples_per_epoch: usize,
    /// 随机种子（权重初始化与 dropout）
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            use_low_precision: false,
            bn_momentum: 0.99,
            weight_decay: 0.004,
            depth: 40,
            growth_rate: 12,
            dropout_rate: 0.2,
            lr_boundaries: vec![150.0, 225.0],
            lr_values: vec![0.1, 0.01, 0.001],
            num_classes: 10,
            image_size: 32,
            examples_per_epoch: 50_000,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// 校验配置，任何一步训练执行前必须通过
    ///
    /// # 错误
    /// - `depth < 4`（阶段深度无法拆分）
    /// - `len(lr_values) != len(lr_boundaries) + 1`
    /// - `lr_boundaries` 非严格递增
    /// - `dropout_rate` 不在 `[0, 1)`、`bn_momentum` 不在 `[0, 1]`
    /// - `batch_size`、`num_classes`、`examples_per_epoch` 为 0
    pub fn validate(&self) -> Result<(), NetError> {
        if self.depth < 4 {
            return Err(NetError::InvalidDepth(self.depth));
        }
        if self.lr_values.len() != self.lr_boundaries.len() + 1 {
            return Err(NetError::ScheduleLengthMismatch {
                boundaries: self.lr_boundaries.len(),
                values: self.lr_values.len(),
            });
        }
        if self.lr_boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(NetError::InvalidConfig(
                "lr_boundaries 必须严格递增".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(NetError::InvalidConfig(format!(
                "dropout_rate 必须在 [0, 1) 内，得到 {}",
                self.dropout_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.bn_momentum) {
            return Err(NetError::InvalidConfig(format!(
                "bn_momentum 必须在 [0, 1] 内，得到 {}",
                self.bn_momentum
            )));
        }
        if self.weight_decay < 0.0 {
            return Err(NetError::InvalidConfig(format!(
                "weight_decay 不能为负，得到 {}",
                self.weight_decay
            )));
        }
        if self.batch_size == 0 {
            return Err(NetError::InvalidConfig("batch_size 必须大于 0".to_string()));
        }
        if self.num_classes == 0 {
            return Err(NetError::InvalidConfig(
                "num_classes 必须大于 0".to_string(),
            ));
        }
        if self.examples_per_epoch == 0 {
            return Err(NetError::InvalidConfig(
                "examples_per_epoch 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_depth_below_four_rejected() {
        let config = TrainConfig {
            depth: 3,
            ..TrainConfig::default()
        };
        assert_eq!(config.validate(), Err(NetError::InvalidDepth(3)));
    }

    #[test]
    fn test_schedule_length_mismatch_rejected() {
        // 2 个边界配 2 个取值：非法
        let config = TrainConfig {
            lr_boundaries: vec![150.0, 225.0],
            lr_values: vec![0.1, 0.01],
            ..TrainConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(NetError::ScheduleLengthMismatch {
                boundaries: 2,
                values: 2,
            })
        );
    }

    #[test]
    fn test_non_increasing_boundaries_rejected() {
        let config = TrainConfig {
            lr_boundaries: vec![225.0, 150.0],
            lr_values: vec![0.1, 0.01, 0.001],
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_dropout_rate_rejected() {
        let config = TrainConfig {
            dropout_rate: 1.0,
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
