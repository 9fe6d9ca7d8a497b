/*
 * @Author       : 老董
 * @Date         : 2026-07-13
 * @Description  : 影子平均（指数滑动平均）仓库
 *
 * 对每个被跟踪量维护 shadow = decay * shadow + (1 - decay) * current。
 * 影子值只供外部评估/上报读取，前向传播永远不读它。
 */

use std::collections::HashMap;
use std::hash::Hash;

use ndarray::ArrayD;

use crate::nn::NetError;

/// 可做影子平均的值
pub trait ShadowValue: Clone {
    /// `shadow = decay * shadow + (1 - decay) * current`
    fn blend(&mut self, current: &Self, decay: f32);
}

impl ShadowValue for f32 {
    fn blend(&mut self, current: &Self, decay: f32) {
        *self = decay * *self + (1.0 - decay) * current;
    }
}

impl ShadowValue for ArrayD<f32> {
    fn blend(&mut self, current: &Self, decay: f32) {
        self.zip_mut_with(current, |s, &c| *s = decay * *s + (1.0 - decay) * c);
    }
}

/// 影子平均仓库
///
/// 键是被跟踪量的稳定标识（损失项用名字，参数用 `ParamId`）。
/// 首次 `update` 时影子初始化为首个观测值，之后按衰减率混合。
///
/// # 使用示例
/// ```
/// use dense_torch::nn::ShadowStore;
///
/// let mut averages: ShadowStore<String, f32> = ShadowStore::new(0.9).unwrap();
/// averages.update("total_loss".to_string(), &2.0);
/// averages.update("total_loss".to_string(), &1.0);
/// // 0.9 * 2.0 + 0.1 * 1.0
/// assert!((averages.get(&"total_loss".to_string()).unwrap() - 1.9).abs() < 1e-6);
/// ```
pub struct ShadowStore<K: Eq + Hash + Clone, V: ShadowValue> {
    decay: f32,
    shadows: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V: ShadowValue> ShadowStore<K, V> {
    /// 创建仓库，`decay` 为衰减率（如损失用 0.9，参数用 0.9999）
    ///
    /// # 错误
    /// `decay` 不在 `[0, 1]` 内时返回配置错误。
    pub fn new(decay: f32) -> Result<Self, NetError> {
        if !(0.0..=1.0).contains(&decay) {
            return Err(NetError::InvalidConfig(format!(
                "影子平均的衰减率必须在 [0, 1] 内，得到 {decay}"
            )));
        }
        Ok(Self {
            decay,
            shadows: HashMap::new(),
        })
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// 用当前值更新影子；键首次出现时影子取当前值本身
    pub fn update(&mut self, key: K, current: &V) {
        match self.shadows.get_mut(&key) {
            Some(shadow) => shadow.blend(current, self.decay),
            None => {
                self.shadows.insert(key, current.clone());
            }
        }
    }

    /// 读取影子值
    pub fn get(&self, key: &K) -> Option<&V> {
        self.shadows.get(key)
    }

    /// 已跟踪的键数
    pub fn len(&self) -> usize {
        self.shadows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shadows.is_empty()
    }
}
