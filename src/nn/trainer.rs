/*
 * @Author       : 老董
 * @Date         : 2026-07-19
 * @Description  : 训练步编排：调度学习率、梯度下降、影子平均
 *
 * 一个训练步对观察者而言是原子的，内部依赖顺序固定：
 *   1. 清零梯度
 *   2. 训练模式前向（BN 滑动统计量的更新随前向发生，属于本步）
 *   3. 损失求值（交叉熵 + 正则池）
 *   4. 损失影子平均更新（衰减 0.9）
 *   5. 反向传播 + 正则梯度累加 —— 梯度针对更新前的参数
 *   6. θ -= lr * ∇θ（学习率取自增量前的 global_step）
 *   7. global_step += 1
 *   8. 参数影子平均更新（衰减 0.9999，取更新后的参数值）
 */

use crate::config::TrainConfig;
use crate::nn::summary::zero_fraction;
use crate::nn::{
    DenseNet, FeatureMap, Labels, LossComputer, LossReport, NetError, ParamId, ParamStore,
    PiecewiseConstantSchedule, RegularizationPool, ShadowStore, SummarySink,
};

/// 损失影子平均的衰减率
pub const LOSS_AVERAGE_DECAY: f32 = 0.9;
/// 参数影子平均的衰减率
pub const PARAM_AVERAGE_DECAY: f32 = 0.9999;

/// 训练器：持有调度器、步计数与两套影子平均仓库
pub struct Trainer {
    schedule: PiecewiseConstantSchedule,
    batch_size: usize,
    examples_per_epoch: usize,
    global_step: u64,
    loss_averages: ShadowStore<String, f32>,
    param_averages: ShadowStore<ParamId, ndarray::ArrayD<f32>>,
}

impl Trainer {
    /// 根据配置创建训练器；学习率调度在此一次性校验
    pub fn new(config: &TrainConfig) -> Result<Self, NetError> {
        config.validate()?;
        let schedule = PiecewiseConstantSchedule::new(
            config.lr_boundaries.clone(),
            config.lr_values.clone(),
        )?;
        Ok(Self {
            schedule,
            batch_size: config.batch_size,
            examples_per_epoch: config.examples_per_epoch,
            global_step: 0,
            loss_averages: ShadowStore::new(LOSS_AVERAGE_DECAY)?,
            param_averages: ShadowStore::new(PARAM_AVERAGE_DECAY)?,
        })
    }

    /// 已完成的训练步数
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// 当前训练进度折算的 epoch 数
    pub fn epoch(&self) -> f32 {
        (self.global_step as f64 * self.batch_size as f64 / self.examples_per_epoch as f64) as f32
    }

    /// 当前（增量前的 global_step 对应的）学习率
    pub fn learning_rate(&self) -> f32 {
        self.schedule.rate_at(self.epoch())
    }

    /// 损失影子平均仓库（外部上报/评估只读）
    pub fn loss_averages(&self) -> &ShadowStore<String, f32> {
        &self.loss_averages
    }

    /// 参数影子平均仓库（外部上报/评估只读）
    pub fn param_averages(&self) -> &ShadowStore<ParamId, ndarray::ArrayD<f32>> {
        &self.param_averages
    }

    /// 执行一个完整训练步，返回本步的损失报告
    ///
    /// 可观察效果：参数、参数影子、损失影子、BN 滑动统计量与 global_step
    /// 全部推进到本步之后的状态；失败时不保证部分推进可续跑（调用方应中止）。
    pub fn train_step(
        &mut self,
        model: &mut DenseNet,
        store: &mut ParamStore,
        pool: &RegularizationPool,
        images: &FeatureMap,
        labels: &Labels,
        sink: &mut dyn SummarySink,
    ) -> Result<LossReport, NetError> {
        // 1. 清零梯度
        store.zero_grads();

        // 2. 训练模式前向
        let logits = model.forward(store, images, true)?;

        // 3. 损失求值
        let report = LossComputer::total_loss(&logits, labels, pool, store)?;

        // 4. 损失影子平均 + 观测上报（原始值与平均值成对上报）
        let lr = self.learning_rate();
        sink.scalar("learning_rate", lr);
        self.observe_loss("cross_entropy", report.cross_entropy, sink);
        for (name, value) in &report.penalties {
            self.observe_loss(&format!("{name}/weight_decay"), *value, sink);
        }
        self.observe_loss("total_loss", report.total, sink);

        let logits_flat: Vec<f32> = logits.iter().cloned().collect();
        sink.histogram("softmax_linear/activations", &logits_flat);
        sink.scalar("softmax_linear/sparsity", zero_fraction(&logits_flat));

        // 5. 反向传播（含正则项的梯度贡献）
        let grad_logits = LossComputer::logits_gradient(&logits, labels)?;
        model.backward(store, &grad_logits)?;
        pool.accumulate_gradients(store);

        // 6. 梯度下降：θ -= lr * ∇θ
        let ids: Vec<ParamId> = store.ids().collect();
        for &id in &ids {
            let grad = store.grad(id).clone();
            store.value_mut(id).scaled_add(-lr, &grad);
        }

        // 7. 步计数推进
        self.global_step += 1;

        // 8. 参数影子平均（必须取更新后的值）+ 参数/梯度直方图
        for &id in &ids {
            self.param_averages.update(id, store.value(id));
            let name = store.name(id).to_string();
            sink.histogram(&name, store.value(id).as_slice().unwrap_or(&[]));
            sink.histogram(
                &format!("{name}/gradients"),
                store.grad(id).as_slice().unwrap_or(&[]),
            );
        }

        Ok(report)
    }

    /// 推理：不改动任何可变状态，产出 logits
    pub fn evaluate(
        &self,
        model: &mut DenseNet,
        store: &ParamStore,
        images: &FeatureMap,
    ) -> Result<crate::nn::Logits, NetError> {
        model.forward(store, images, false)
    }

    /// batch 准确率（评估辅助）
    pub fn accuracy(logits: &crate::nn::Logits, labels: &Labels) -> f32 {
        let batch = logits.nrows();
        if batch == 0 {
            return 0.0;
        }
        let mut correct = 0usize;
        for b in 0..batch {
            let row = logits.row(b);
            let mut best = 0usize;
            for c in 1..row.len() {
                if row[c] > row[best] {
                    best = c;
                }
            }
            if best == labels[b] {
                correct += 1;
            }
        }
        correct as f32 / batch as f32
    }

    /// 更新一个损失项的影子平均，并把原始值与平均值都上报
    fn observe_loss(&mut self, name: &str, value: f32, sink: &mut dyn SummarySink) {
        self.loss_averages.update(name.to_string(), &value);
        sink.scalar(&format!("{name} (raw)"), value);
        sink.scalar(
            name,
            *self
                .loss_averages
                .get(&name.to_string())
                .expect("刚更新过的键必然存在"),
        );
    }
}
