/*
 * @Author       : 老董
 * @Date         : 2026-07-14
 * @Description  : 观测上报接口（标量/直方图）
 *
 * 纯观测用途：训练核心只往 sink 里写，从不读回。
 * 层级标签由调用方用 '/' 拼接的路径字符串表达，对计算没有任何影响。
 */

/// 观测上报接口
pub trait SummarySink {
    /// 上报一个命名标量（如学习率、损失原始值与滑动平均值、激活稀疏度）
    fn scalar(&mut self, tag: &str, value: f32);

    /// 上报一组值的直方图观测（如参数、梯度、logits）
    fn histogram(&mut self, tag: &str, values: &[f32]);
}

/// 丢弃所有观测的默认 sink
#[derive(Default)]
pub struct NullSink;

impl SummarySink for NullSink {
    fn scalar(&mut self, _tag: &str, _value: f32) {}
    fn histogram(&mut self, _tag: &str, _values: &[f32]) {}
}

/// 记录所有观测的 sink（测试用）
#[derive(Default)]
pub struct RecordingSink {
    pub scalars: Vec<(String, f32)>,
    pub histograms: Vec<(String, usize)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取某个标签最近一次上报的标量
    pub fn last_scalar(&self, tag: &str) -> Option<f32> {
        self.scalars
            .iter()
            .rev()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| *v)
    }
}

impl SummarySink for RecordingSink {
    fn scalar(&mut self, tag: &str, value: f32) {
        self.scalars.push((tag.to_string(), value));
    }

    fn histogram(&mut self, tag: &str, values: &[f32]) {
        // 只记录标签与样本数，直方图本体对测试无意义
        self.histograms.push((tag.to_string(), values.len()));
    }
}

/// 一组值中零元素的占比（激活稀疏度）
pub fn zero_fraction(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let zeros = values.iter().filter(|&&v| v == 0.0).count();
    zeros as f32 / values.len() as f32
}
