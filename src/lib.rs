//! # Dense Torch
//!
//! `dense_torch`用纯rust实现一个密集连接卷积网络（[DenseNet](https://arxiv.org/abs/1608.06993)）
//! 的训练核心：按增长率逐层拼接特征图的网络装配、交叉熵与L2正则合成的损失计算，
//! 以及带分段常数学习率与参数/损失影子平均（shadow average）的梯度下降训练步。
//!
//! 数据的读取、解码与增广属于外部协作者（见`data::BatchProvider`），本crate只消费
//! 已经组好batch的张量。

pub mod config;
pub mod data;
pub mod nn;
