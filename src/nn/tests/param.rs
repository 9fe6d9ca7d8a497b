/*
 * @Author       : 老董
 * @Date         : 2026-07-20
 * @Description  : 参数仓库与正则池单元测试
 */

use approx::assert_abs_diff_eq;
use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::{Init, NetError, ParamStore, RegularizationPool};

/// 登记/读取/命名
#[test]
fn test_register_and_access() {
    let mut store = ParamStore::new();
    let mut rng = StdRng::seed_from_u64(42);
    let w = store
        .register("fc/weights", &[2, 3], Init::Zeros, &mut rng)
        .unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.name(w), "fc/weights");
    assert_eq!(store.value(w).shape(), &[2, 3]);
    assert_eq!(store.grad(w).shape(), &[2, 3]);
    assert!(store.value(w).iter().all(|&v| v == 0.0));
}

/// 初始化器：Ones 全 1，Normal 非退化
#[test]
fn test_initializers() {
    let mut store = ParamStore::new();
    let mut rng = StdRng::seed_from_u64(42);
    let ones = store.register("ones", &[4], Init::Ones, &mut rng).unwrap();
    assert!(store.value(ones).iter().all(|&v| v == 1.0));

    let normal = store
        .register("normal", &[1000], Init::Normal { std: 0.05 }, &mut rng)
        .unwrap();
    let values = store.value(normal);
    let mean: f32 = values.iter().sum::<f32>() / 1000.0;
    let var: f32 = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 1000.0;
    // 1000 个样本下均值与方差都应落在宽松区间内
    assert!(mean.abs() < 0.01);
    assert!(var > 0.001 && var < 0.005);
}

/// 参数名重复：显式报错
#[test]
fn test_duplicate_name_rejected() {
    let mut store = ParamStore::new();
    let mut rng = StdRng::seed_from_u64(42);
    store.register("w", &[2], Init::Zeros, &mut rng).unwrap();
    let result = store.register("w", &[3], Init::Zeros, &mut rng);
    assert_eq!(
        result.err(),
        Some(NetError::DuplicateParameterName("w".to_string()))
    );
}

/// 梯度累加与清零
#[test]
fn test_grad_accumulate_and_zero() {
    let mut store = ParamStore::new();
    let mut rng = StdRng::seed_from_u64(42);
    let w = store.register("w", &[2], Init::Zeros, &mut rng).unwrap();

    *store.grad_mut(w) += &Array1::from_vec(vec![1.0, 2.0]).into_dyn();
    *store.grad_mut(w) += &Array1::from_vec(vec![1.0, 2.0]).into_dyn();
    assert_abs_diff_eq!(store.grad(w)[[0]], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(store.grad(w)[[1]], 4.0, epsilon = 1e-6);

    store.zero_grads();
    assert!(store.grad(w).iter().all(|&g| g == 0.0));
}

/// 正则池：惩罚值 = coeff * Σw² / 2，梯度贡献 = coeff * w
#[test]
fn test_pool_penalty_and_gradient() {
    let mut store = ParamStore::new();
    let mut pool = RegularizationPool::new();
    let mut rng = StdRng::seed_from_u64(42);
    let w = store.register("w", &[2], Init::Zeros, &mut rng).unwrap();
    store
        .value_mut(w)
        .assign(&Array1::from_vec(vec![3.0, 4.0]).into_dyn());
    pool.register(w, 0.1);

    let penalties = pool.penalties(&store);
    assert_eq!(penalties.len(), 1);
    assert_eq!(penalties[0].0, "w");
    assert_abs_diff_eq!(penalties[0].1, 0.1 * 25.0 / 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(pool.total_penalty(&store), 1.25, epsilon = 1e-6);

    pool.accumulate_gradients(&mut store);
    assert_abs_diff_eq!(store.grad(w)[[0]], 0.3, epsilon = 1e-6);
    assert_abs_diff_eq!(store.grad(w)[[1]], 0.4, epsilon = 1e-6);
}

/// 两个独立的池互不污染账目
#[test]
fn test_pools_are_isolated() {
    let mut store = ParamStore::new();
    let mut rng = StdRng::seed_from_u64(42);
    let a = store.register("a", &[1], Init::Ones, &mut rng).unwrap();
    let b = store.register("b", &[1], Init::Ones, &mut rng).unwrap();

    let mut pool_a = RegularizationPool::new();
    let mut pool_b = RegularizationPool::new();
    pool_a.register(a, 1.0);
    pool_b.register(b, 2.0);

    assert_abs_diff_eq!(pool_a.total_penalty(&store), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(pool_b.total_penalty(&store), 1.0, epsilon = 1e-6);

    // 只累加 pool_a：b 的梯度保持为零
    pool_a.accumulate_gradients(&mut store);
    assert_abs_diff_eq!(store.grad(a)[[0]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(store.grad(b)[[0]], 0.0, epsilon = 1e-6);
}
