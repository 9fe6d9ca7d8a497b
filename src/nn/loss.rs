/*
 * @Author       : 老董
 * @Date         : 2026-07-18
 * @Description  : 损失合成：稀疏 softmax 交叉熵 + L2 正则池
 *
 * 数值稳定性：用 log-sum-exp 技巧计算交叉熵，
 *   L = -(x_label - max - log Σ exp(x_j - max))，按 batch 取均值。
 * 梯度形式简洁：∂L/∂x = (softmax(x) - onehot(y)) / batch。
 */

use ndarray::Array2;

use crate::nn::{Labels, Logits, NetError, ParamStore, RegularizationPool};

/// 一次损失求值的分项报告
#[derive(Debug, Clone)]
pub struct LossReport {
    /// batch 平均交叉熵
    pub cross_entropy: f32,
    /// 每个已登记正则项：(参数名, 惩罚值)
    pub penalties: Vec<(String, f32)>,
    /// 交叉熵与全部惩罚项之和
    pub total: f32,
}

/// 损失计算器（无状态，纯函数集合）
pub struct LossComputer;

impl LossComputer {
    /// 校验 logits 与 labels 的形状与取值范围
    fn check_inputs(logits: &Logits, labels: &Labels) -> Result<(), NetError> {
        let (batch, classes) = logits.dim();
        if labels.len() != batch {
            return Err(NetError::ShapeMismatch {
                expected: vec![batch],
                got: vec![labels.len()],
                message: "labels 数量必须等于 batch 大小".to_string(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= classes) {
            return Err(NetError::InvalidConfig(format!(
                "标签 {bad} 超出类别数 {classes}"
            )));
        }
        Ok(())
    }

    /// 计算总损失
    ///
    /// 正则池只被读取、不被清空：同一状态下重复调用返回完全相同的标量。
    pub fn total_loss(
        logits: &Logits,
        labels: &Labels,
        pool: &RegularizationPool,
        store: &ParamStore,
    ) -> Result<LossReport, NetError> {
        Self::check_inputs(logits, labels)?;
        let (batch, classes) = logits.dim();

        let mut total_ce = 0.0f32;
        for b in 0..batch {
            let row = logits.row(b);
            let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let mut sum_exp = 0.0f32;
            for c in 0..classes {
                sum_exp += (row[c] - max).exp();
            }
            total_ce += -(row[labels[b]] - max - sum_exp.ln());
        }
        let cross_entropy = total_ce / batch as f32;

        let penalties: Vec<(String, f32)> = pool
            .penalties(store)
            .into_iter()
            .map(|(name, v)| (name.to_string(), v))
            .collect();
        let total = cross_entropy + penalties.iter().map(|(_, v)| v).sum::<f32>();

        Ok(LossReport {
            cross_entropy,
            penalties,
            total,
        })
    }

    /// 交叉熵对 logits 的梯度：`(softmax(logits) - onehot(labels)) / batch`
    pub fn logits_gradient(logits: &Logits, labels: &Labels) -> Result<Array2<f32>, NetError> {
        Self::check_inputs(logits, labels)?;
        let (batch, classes) = logits.dim();

        let mut grad = Array2::<f32>::zeros((batch, classes));
        for b in 0..batch {
            let row = logits.row(b);
            let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let mut sum_exp = 0.0f32;
            for c in 0..classes {
                let e = (row[c] - max).exp();
                grad[[b, c]] = e;
                sum_exp += e;
            }
            for c in 0..classes {
                grad[[b, c]] /= sum_exp;
            }
            grad[[b, labels[b]]] -= 1.0;
        }
        grad /= batch as f32;
        Ok(grad)
    }
}
