/*
 * @Author       : 老董
 * @Date         : 2026-07-12
 * @Description  : 负责神经网络（neural network）的构建与训练步编排
 */

mod error;
mod init;
pub mod layer;
mod loss;
mod model;
mod param;
mod schedule;
mod shadow;
pub mod summary;
mod trainer;

pub use error::NetError;
pub use init::Init;
pub use loss::{LossComputer, LossReport};
pub use model::{DenseNet, stage_depths};
pub use param::{ParamId, ParamStore, RegularizationPool};
pub use schedule::PiecewiseConstantSchedule;
pub use shadow::{ShadowStore, ShadowValue};
pub use summary::{NullSink, RecordingSink, SummarySink};
pub use trainer::{LOSS_AVERAGE_DECAY, PARAM_AVERAGE_DECAY, Trainer};

use ndarray::{Array1, Array2, Array4};

/// 特征图：`[batch, height, width, channels]`（NHWC）
pub type FeatureMap = Array4<f32>;
/// 未归一化的类别得分：`[batch, num_classes]`
pub type Logits = Array2<f32>;
/// 整数类别标签：`[batch]`
pub type Labels = Array1<usize>;

#[cfg(test)]
mod tests;
