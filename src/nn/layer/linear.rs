/*
 * @Author       : 老董
 * @Date         : 2026-07-16
 * @Description  : 全连接分类头：output = x @ W + b
 *
 * 权重初始化用 N(0, 1/in_features)——沿用原网络的字面公式，
 * 不要"修正"成常见的 fan-in 初始化。权重与偏置都做 L2 正则。
 */

use ndarray::{Array2, Ix1, Ix2};
use rand::rngs::StdRng;

use crate::nn::{Init, NetError, ParamId, ParamStore, RegularizationPool};

/// 全连接层
///
/// 输入 [batch, in_features]，输出 [batch, out_features]。
pub struct Linear {
    /// 权重参数 [in_features, out_features]
    weights: ParamId,
    /// 偏置参数 [out_features]，初始为 0
    bias: ParamId,
    in_features: usize,
    out_features: usize,
    /// 反向传播缓存：本次前向的输入
    input: Option<Array2<f32>>,
}

impl Linear {
    pub fn new(
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
        name: &str,
        in_features: usize,
        out_features: usize,
        weight_decay: f32,
        rng: &mut StdRng,
    ) -> Result<Self, NetError> {
        let weights = store.register(
            &format!("{name}/weights"),
            &[in_features, out_features],
            Init::Normal {
                std: 1.0 / in_features as f32,
            },
            rng,
        )?;
        let bias = store.register(&format!("{name}/bias"), &[out_features], Init::Zeros, rng)?;
        pool.register(weights, weight_decay);
        pool.register(bias, weight_decay);

        Ok(Self {
            weights,
            bias,
            in_features,
            out_features,
            input: None,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weights(&self) -> ParamId {
        self.weights
    }

    pub fn bias(&self) -> ParamId {
        self.bias
    }

    /// 前向传播：`x @ W + b`
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &Array2<f32>,
        training: bool,
    ) -> Result<Array2<f32>, NetError> {
        if x.ncols() != self.in_features {
            return Err(NetError::ShapeMismatch {
                expected: vec![x.nrows(), self.in_features],
                got: x.shape().to_vec(),
                message: "全连接层输入特征维不匹配".to_string(),
            });
        }
        let weights = store
            .value(self.weights)
            .view()
            .into_dimensionality::<Ix2>()
            .expect("全连接权重必须是 2D 张量");
        let bias = store
            .value(self.bias)
            .view()
            .into_dimensionality::<Ix1>()
            .expect("全连接偏置必须是 1D 张量");

        let mut output = x.dot(&weights);
        output += &bias;

        if training {
            self.input = Some(x.clone());
        } else {
            self.input = None;
        }
        Ok(output)
    }

    /// 反向传播：dW = xᵀ g，db = Σ g，dx = g Wᵀ
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &Array2<f32>,
    ) -> Result<Array2<f32>, NetError> {
        let x = self.input.take().ok_or_else(|| {
            NetError::ComputationError(
                "全连接层反向传播前必须先执行训练模式前向传播".to_string(),
            )
        })?;

        let grad_weights = x.t().dot(grad_out);
        let grad_bias = grad_out.sum_axis(ndarray::Axis(0));

        let weights = store
            .value(self.weights)
            .view()
            .into_dimensionality::<Ix2>()
            .expect("全连接权重必须是 2D 张量")
            .to_owned();
        let grad_input = grad_out.dot(&weights.t());

        *store.grad_mut(self.weights) += &grad_weights.into_dyn();
        *store.grad_mut(self.bias) += &grad_bias.into_dyn();
        Ok(grad_input)
    }
}
