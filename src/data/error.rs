//! 数据供应错误类型定义

use thiserror::Error;

/// 数据供应相关错误
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    /// 数据集为空
    #[error("数据集为空")]
    EmptyDataset,

    /// 样本数不一致
    #[error("images 与 labels 的样本数必须一致，得到 {images} 与 {labels}")]
    SampleCountMismatch { images: usize, labels: usize },

    /// batch 大小非法
    #[error("batch_size 必须大于 0 且不超过样本数 {samples}，得到 {batch_size}")]
    InvalidBatchSize { batch_size: usize, samples: usize },

    /// 标签越界
    #[error("标签 {label} 超出类别数 {num_classes}")]
    LabelOutOfRange { label: usize, num_classes: usize },
}
