//! 数据供应模块
//!
//! 训练核心只消费「已经组好 batch 的张量」：从磁盘读字节、解码与增广图像
//! 都属于外部协作者。本模块定义消费侧接口 [`BatchProvider`]，
//! 并提供一个内存版实现 [`InMemoryBatches`] 供训练与测试使用。
//!
//! # 使用示例
//!
//! ```ignore
//! use dense_torch::data::{BatchProvider, InMemoryBatches, Mode};
//!
//! let mut provider = InMemoryBatches::new(images, labels, 10, 128)?.seed(42);
//! let (x, y) = provider.next_batch(Mode::Train)?;
//! ```

mod error;
mod provider;
pub mod transforms;

pub use error::DataError;
pub use provider::{BatchProvider, InMemoryBatches, Mode};
