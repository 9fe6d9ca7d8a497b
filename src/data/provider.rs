/*
 * @Author       : 老董
 * @Date         : 2026-07-19
 * @Description  : batch 供应接口与内存版实现
 */

use ndarray::Axis;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::{DataError, transforms};
use crate::nn::{FeatureMap, Labels};

/// batch 的供应模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 训练：每个 epoch 重新洗牌
    Train,
    /// 评估：按样本原序循环，顺序确定
    Eval,
}

/// batch 供应方：每次调用产出一个 `[batch, h, w, c]` 图像张量与对应标签
///
/// 实现方负责洗牌与循环；训练核心对数据来源一无所知。
pub trait BatchProvider {
    /// 产出下一个 batch
    fn next_batch(&mut self, mode: Mode) -> Result<(FeatureMap, Labels), DataError>;

    /// 每个 batch 的样本数
    fn batch_size(&self) -> usize;
}

/// 把整套数据常驻内存的供应方（训练小数据集与测试用）
pub struct InMemoryBatches {
    images: FeatureMap,
    labels: Labels,
    batch_size: usize,
    low_precision: bool,
    rng: StdRng,
    /// 训练模式的洗牌序；耗尽后重洗
    train_order: Vec<usize>,
    train_cursor: usize,
    eval_cursor: usize,
}

impl InMemoryBatches {
    /// 创建供应方并校验数据集
    ///
    /// # 错误
    /// 数据集为空、images 与 labels 样本数不一致、batch 大小非法
    /// 或存在越界标签时返回相应错误。
    pub fn new(
        images: FeatureMap,
        labels: Labels,
        num_classes: usize,
        batch_size: usize,
    ) -> Result<Self, DataError> {
        let samples = images.len_of(Axis(0));
        if samples == 0 {
            return Err(DataError::EmptyDataset);
        }
        if labels.len() != samples {
            return Err(DataError::SampleCountMismatch {
                images: samples,
                labels: labels.len(),
            });
        }
        if batch_size == 0 || batch_size > samples {
            return Err(DataError::InvalidBatchSize {
                batch_size,
                samples,
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(DataError::LabelOutOfRange {
                label: bad,
                num_classes,
            });
        }
        Ok(Self {
            images,
            labels,
            batch_size,
            low_precision: false,
            rng: StdRng::seed_from_u64(0),
            train_order: Vec::new(),
            train_cursor: 0,
            eval_cursor: 0,
        })
    }

    /// 设定洗牌种子（默认 0）
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.train_order.clear();
        self.train_cursor = 0;
        self
    }

    /// 启用半精度存储模拟：产出的图像经过 f16 往返量化
    pub fn low_precision(mut self, enabled: bool) -> Self {
        self.low_precision = enabled;
        self
    }

    /// 数据集的样本总数
    pub fn samples(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    /// 取出下一组训练样本下标（必要时重洗）
    fn next_train_indices(&mut self) -> Vec<usize> {
        let samples = self.samples();
        let mut picked = Vec::with_capacity(self.batch_size);
        while picked.len() < self.batch_size {
            if self.train_cursor >= self.train_order.len() {
                self.train_order = (0..samples).collect();
                self.train_order.shuffle(&mut self.rng);
                self.train_cursor = 0;
            }
            picked.push(self.train_order[self.train_cursor]);
            self.train_cursor += 1;
        }
        picked
    }

    /// 取出下一组评估样本下标（原序循环）
    fn next_eval_indices(&mut self) -> Vec<usize> {
        let samples = self.samples();
        let mut picked = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            picked.push(self.eval_cursor);
            self.eval_cursor = (self.eval_cursor + 1) % samples;
        }
        picked
    }
}

impl BatchProvider for InMemoryBatches {
    fn next_batch(&mut self, mode: Mode) -> Result<(FeatureMap, Labels), DataError> {
        let indices = match mode {
            Mode::Train => self.next_train_indices(),
            Mode::Eval => self.next_eval_indices(),
        };
        let mut images = self.images.select(Axis(0), &indices);
        let labels = self.labels.select(Axis(0), &indices);
        if self.low_precision {
            transforms::quantize_images(&mut images);
        }
        Ok((images, labels))
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}
