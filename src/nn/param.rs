/*
 * @Author       : 老董
 * @Date         : 2026-07-13
 * @Description  : 可训练参数仓库与 L2 正则池
 *
 * 设计决策：
 * - 参数集中存放在 ParamStore，层只持有 ParamId 句柄（类似图节点持有 NodeId）
 * - 正则项在参数创建处登记进显式的 RegularizationPool，而非全局集合，
 *   使两个独立网络的惩罚账目互不污染
 */

use ndarray::ArrayD;
use rand::rngs::StdRng;

use crate::nn::{Init, NetError};

/// 可训练参数的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(usize);

/// 单个可训练参数：命名张量 + 同形状梯度缓冲
struct Parameter {
    name: String,
    value: ArrayD<f32>,
    grad: ArrayD<f32>,
}

/// 可训练参数仓库
///
/// 前向传播只读参数值；梯度在反向传播中累加；参数值只由优化器一步修改。
///
/// # 使用示例
/// ```
/// use dense_torch::nn::{Init, ParamStore};
/// use rand::SeedableRng;
///
/// let mut store = ParamStore::new();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let w = store
///     .register("fc/weights", &[8, 10], Init::Normal { std: 0.05 }, &mut rng)
///     .unwrap();
/// assert_eq!(store.value(w).shape(), &[8, 10]);
/// ```
#[derive(Default)]
pub struct ParamStore {
    params: Vec<Parameter>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// 登记一个新参数并返回句柄
    ///
    /// # 错误
    /// 参数名重复时返回 `DuplicateParameterName`
    pub fn register(
        &mut self,
        name: &str,
        shape: &[usize],
        init: Init,
        rng: &mut StdRng,
    ) -> Result<ParamId, NetError> {
        if self.params.iter().any(|p| p.name == name) {
            return Err(NetError::DuplicateParameterName(name.to_string()));
        }
        let value = init.generate_with_rng(shape, rng);
        let grad = ArrayD::zeros(value.raw_dim());
        self.params.push(Parameter {
            name: name.to_string(),
            value,
            grad,
        });
        Ok(ParamId(self.params.len() - 1))
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// 所有参数句柄（按登记顺序）
    pub fn ids(&self) -> impl Iterator<Item = ParamId> + '_ {
        (0..self.params.len()).map(ParamId)
    }

    /// 参数名
    pub fn name(&self, id: ParamId) -> &str {
        &self.params[id.0].name
    }

    /// 参数值（只读）
    pub fn value(&self, id: ParamId) -> &ArrayD<f32> {
        &self.params[id.0].value
    }

    /// 参数值（可写，仅供优化器更新）
    pub fn value_mut(&mut self, id: ParamId) -> &mut ArrayD<f32> {
        &mut self.params[id.0].value
    }

    /// 梯度（只读）
    pub fn grad(&self, id: ParamId) -> &ArrayD<f32> {
        &self.params[id.0].grad
    }

    /// 梯度（可写，供反向传播累加）
    pub fn grad_mut(&mut self, id: ParamId) -> &mut ArrayD<f32> {
        &mut self.params[id.0].grad
    }

    /// 清零所有梯度（每个训练步开始时调用）
    pub fn zero_grads(&mut self) {
        for p in &mut self.params {
            p.grad.fill(0.0);
        }
    }
}

/// L2 正则池
///
/// 每条记录为 `(参数句柄, 正则系数)`。惩罚值为 `coeff * sum(w^2) / 2`，
/// 对应的梯度贡献为 `coeff * w`。池只被读取、不被清空，
/// 同一训练步内重复求值不会重复计账。
#[derive(Default)]
pub struct RegularizationPool {
    terms: Vec<(ParamId, f32)>,
}

impl RegularizationPool {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// 登记一个参数的 L2 惩罚项
    pub fn register(&mut self, id: ParamId, coeff: f32) {
        self.terms.push((id, coeff));
    }

    /// 已登记的项数
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// 逐项求值：`(参数名, coeff * sum(w^2) / 2)`
    pub fn penalties<'a>(&'a self, store: &'a ParamStore) -> Vec<(&'a str, f32)> {
        self.terms
            .iter()
            .map(|&(id, coeff)| {
                let w = store.value(id);
                let l2 = w.iter().map(|x| x * x).sum::<f32>() / 2.0;
                (store.name(id), coeff * l2)
            })
            .collect()
    }

    /// 所有惩罚项之和
    pub fn total_penalty(&self, store: &ParamStore) -> f32 {
        self.penalties(store).iter().map(|(_, v)| v).sum()
    }

    /// 把每项的梯度贡献 `coeff * w` 累加进参数梯度
    ///
    /// 须在模型反向传播之后、参数更新之前调用一次。
    pub fn accumulate_gradients(&self, store: &mut ParamStore) {
        for &(id, coeff) in &self.terms {
            let w = store.value(id).clone();
            store.grad_mut(id).scaled_add(coeff, &w);
        }
    }
}
