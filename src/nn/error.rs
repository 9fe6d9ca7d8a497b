/*
 * @Author       : 老董
 * @Date         : 2026-07-12
 * @Description  : nn 模块的错误类型
 */

use thiserror::Error;

/// 网络构建与训练过程的错误类型
///
/// 配置类错误在任何训练步执行前即失败；训练步内部不定义可恢复错误——
/// 一步要么完整成功，要么由进程级调用者中止（部分应用的状态不可安全续跑）。
#[derive(Debug, Error, PartialEq)]
pub enum NetError {
    /// 通用配置错误
    #[error("配置错误：{0}")]
    InvalidConfig(String),

    /// 网络深度不足以拆分出三个 dense 阶段
    #[error("网络深度必须 >= 4（3 个 dense 阶段 + 4 个固定层），得到 {0}")]
    InvalidDepth(usize),

    /// 学习率调度的边界数与取值数不匹配
    #[error("学习率调度配置错误：len(lr_values) 必须等于 len(lr_boundaries)+1，得到 {values} 与 {boundaries}")]
    ScheduleLengthMismatch { boundaries: usize, values: usize },

    /// 张量形状不匹配
    #[error("形状不匹配：期望 {expected:?}，实际 {got:?}（{message}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    /// 特征图尺寸无法进行 2x2/步长 2 的非重叠池化
    #[error("特征图尺寸 {height}x{width} 无法被 2 整除，无法进行 2x2 平均池化")]
    DimensionNotDivisible { height: usize, width: usize },

    /// 参数名重复
    #[error("重复的参数名：{0}")]
    DuplicateParameterName(String),

    /// 计算顺序错误等运行期问题
    #[error("计算错误：{0}")]
    ComputationError(String),
}
