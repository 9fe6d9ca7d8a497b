/*
 * @Author       : 老董
 * @Date         : 2026-07-20
 * @Description  : 损失合成单元测试（交叉熵、正则池、logits 梯度）
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, arr2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::{Init, LossComputer, NetError, ParamStore, RegularizationPool};

/// 全零 logits（等价均匀分布）的交叉熵是 ln(类别数)
#[test]
fn test_uniform_logits_cross_entropy() {
    let logits = Array2::<f32>::zeros((4, 10));
    let labels = Array1::from_vec(vec![0, 3, 7, 9]);
    let pool = RegularizationPool::new();
    let store = ParamStore::new();

    let report = LossComputer::total_loss(&logits, &labels, &pool, &store).unwrap();
    assert_abs_diff_eq!(report.cross_entropy, 10.0f32.ln(), epsilon = 1e-5);
    assert!(report.penalties.is_empty());
    assert_abs_diff_eq!(report.total, report.cross_entropy, epsilon = 1e-6);
}

/// 正确类 logit 越大损失越小
#[test]
fn test_confident_prediction_lowers_loss() {
    let labels = Array1::from_vec(vec![0]);
    let pool = RegularizationPool::new();
    let store = ParamStore::new();

    let weak = LossComputer::total_loss(&arr2(&[[0.0, 0.0]]), &labels, &pool, &store).unwrap();
    let strong = LossComputer::total_loss(&arr2(&[[5.0, 0.0]]), &labels, &pool, &store).unwrap();
    assert!(strong.cross_entropy < weak.cross_entropy);
}

/// 损失求值幂等：池只被读取不被清空
#[test]
fn test_total_loss_is_idempotent() {
    let mut store = ParamStore::new();
    let mut pool = RegularizationPool::new();
    let mut rng = StdRng::seed_from_u64(42);
    let w = store
        .register("w", &[3], Init::Normal { std: 1.0 }, &mut rng)
        .unwrap();
    pool.register(w, 0.1);

    let logits = arr2(&[[1.0, -1.0]]);
    let labels = Array1::from_vec(vec![0]);
    let first = LossComputer::total_loss(&logits, &labels, &pool, &store).unwrap();
    let second = LossComputer::total_loss(&logits, &labels, &pool, &store).unwrap();
    assert_eq!(first.total, second.total);
    assert_eq!(first.penalties, second.penalties);
}

/// 总损失 = 交叉熵 + 各惩罚项；惩罚项 = coeff * Σw² / 2
#[test]
fn test_penalty_terms_included() {
    let mut store = ParamStore::new();
    let mut pool = RegularizationPool::new();
    let mut rng = StdRng::seed_from_u64(0);
    let w = store.register("w", &[3], Init::Zeros, &mut rng).unwrap();
    store
        .value_mut(w)
        .assign(&Array1::from_vec(vec![1.0, 2.0, 2.0]).into_dyn());
    pool.register(w, 0.1);

    let logits = Array2::<f32>::zeros((1, 2));
    let labels = Array1::from_vec(vec![0]);
    let report = LossComputer::total_loss(&logits, &labels, &pool, &store).unwrap();

    assert_eq!(report.penalties.len(), 1);
    assert_abs_diff_eq!(report.penalties[0].1, 0.1 * 9.0 / 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(
        report.total,
        report.cross_entropy + 0.45,
        epsilon = 1e-6
    );
}

/// logits 梯度：每行元素之和为 0，正确类分量为负
#[test]
fn test_logits_gradient_rows_sum_to_zero() {
    let logits = arr2(&[[1.0, 2.0, 0.5], [0.0, 0.0, 3.0]]);
    let labels = Array1::from_vec(vec![1, 0]);
    let grad = LossComputer::logits_gradient(&logits, &labels).unwrap();

    for b in 0..2 {
        let row_sum: f32 = grad.row(b).iter().sum();
        assert_abs_diff_eq!(row_sum, 0.0, epsilon = 1e-6);
        assert!(grad[[b, labels[b]]] < 0.0);
    }
}

/// 全零 logits、单样本：梯度 = (1/C - onehot) / batch
#[test]
fn test_logits_gradient_uniform_case() {
    let logits = Array2::<f32>::zeros((1, 4));
    let labels = Array1::from_vec(vec![2]);
    let grad = LossComputer::logits_gradient(&logits, &labels).unwrap();
    for c in 0..4 {
        let expected = if c == 2 { 0.25 - 1.0 } else { 0.25 };
        assert_abs_diff_eq!(grad[[0, c]], expected, epsilon = 1e-6);
    }
}

/// 标签数不等于 batch、标签越界：显式报错
#[test]
fn test_invalid_inputs_rejected() {
    let logits = Array2::<f32>::zeros((2, 3));
    let pool = RegularizationPool::new();
    let store = ParamStore::new();

    let short = Array1::from_vec(vec![0]);
    assert!(matches!(
        LossComputer::total_loss(&logits, &short, &pool, &store),
        Err(NetError::ShapeMismatch { .. })
    ));

    let out_of_range = Array1::from_vec(vec![0, 3]);
    assert!(LossComputer::logits_gradient(&logits, &out_of_range).is_err());
}
