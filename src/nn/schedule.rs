/*
 * @Author       : 老董
 * @Date         : 2026-07-13
 * @Description  : 分段常数学习率调度
 */

use crate::nn::NetError;

/// 分段常数学习率
///
/// 输入以 epoch 为单位（`global_step * batch_size / examples_per_epoch`）。
/// 语义与 `tf.train.piecewise_constant` 一致：
/// - `x <= boundaries[0]` 时取 `values[0]`；
/// - `boundaries[i-1] < x <= boundaries[i]` 时取 `values[i]`；
/// - `x > boundaries[last]` 时取 `values[last]`。
#[derive(Debug, Clone)]
pub struct PiecewiseConstantSchedule {
    boundaries: Vec<f32>,
    values: Vec<f32>,
}

impl PiecewiseConstantSchedule {
    /// 创建调度
    ///
    /// # 错误
    /// - `values.len() != boundaries.len() + 1`
    /// - `boundaries` 非严格递增
    pub fn new(boundaries: Vec<f32>, values: Vec<f32>) -> Result<Self, NetError> {
        if values.len() != boundaries.len() + 1 {
            return Err(NetError::ScheduleLengthMismatch {
                boundaries: boundaries.len(),
                values: values.len(),
            });
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(NetError::InvalidConfig(
                "学习率边界必须严格递增".to_string(),
            ));
        }
        Ok(Self { boundaries, values })
    }

    /// 取 `epoch` 处的学习率
    pub fn rate_at(&self, epoch: f32) -> f32 {
        for (boundary, value) in self.boundaries.iter().zip(&self.values) {
            if epoch <= *boundary {
                return *value;
            }
        }
        *self.values.last().unwrap()
    }

    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
