/*
 * @Author       : 老董
 * @Date         : 2026-07-20
 * @Description  : 平均池化单元测试（2x2 非重叠池化与全局平均池化）
 */

use approx::assert_abs_diff_eq;
use ndarray::Array4;

use crate::nn::NetError;
use crate::nn::layer::{
    avg_pool2d_2x2, avg_pool2d_2x2_backward, global_avg_pool, global_avg_pool_backward,
};

/// 4x4 单通道，1..=16 按行排布：池化输出为各 2x2 窗口的均值
#[test]
fn test_avg_pool_forward() {
    let x = Array4::from_shape_vec(
        (1, 4, 4, 1),
        (1..=16).map(|v| v as f32).collect(),
    )
    .unwrap();
    let output = avg_pool2d_2x2(&x).unwrap();

    assert_eq!(output.dim(), (1, 2, 2, 1));
    assert_abs_diff_eq!(output[[0, 0, 0, 0]], 3.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 1, 0]], 5.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 0, 0]], 11.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 1, 0]], 13.5, epsilon = 1e-6);
}

/// 高或宽为奇数时显式失败
#[test]
fn test_avg_pool_odd_dims_rejected() {
    let x = Array4::<f32>::zeros((1, 3, 4, 2));
    assert_eq!(
        avg_pool2d_2x2(&x),
        Err(NetError::DimensionNotDivisible {
            height: 3,
            width: 4,
        })
    );
}

/// 反向传播：每个输出梯度均摊到窗口的 4 个位置
#[test]
fn test_avg_pool_backward() {
    let grad_out = Array4::from_shape_vec((1, 1, 1, 1), vec![8.0]).unwrap();
    let grad = avg_pool2d_2x2_backward(&grad_out);
    assert_eq!(grad.dim(), (1, 2, 2, 1));
    for i in 0..2 {
        for j in 0..2 {
            assert_abs_diff_eq!(grad[[0, i, j, 0]], 2.0, epsilon = 1e-6);
        }
    }
}

/// 全局平均池化：[batch, H, W, C] → [batch, C]
#[test]
fn test_global_avg_pool() {
    // 通道 0 全 2，通道 1 取值 0/4（均值 2 与 2）
    let x = Array4::from_shape_fn((1, 2, 2, 2), |(_, i, j, c)| {
        if c == 0 { 2.0 } else { ((i * 2 + j) % 2) as f32 * 4.0 }
    });
    let pooled = global_avg_pool(&x);
    assert_eq!(pooled.dim(), (1, 2));
    assert_abs_diff_eq!(pooled[[0, 0]], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(pooled[[0, 1]], 2.0, epsilon = 1e-6);
}

/// 全局平均池化的反向：梯度除以 H*W 后铺满空间
#[test]
fn test_global_avg_pool_backward() {
    let grad_out = ndarray::Array2::from_shape_vec((1, 1), vec![8.0]).unwrap();
    let grad = global_avg_pool_backward(&grad_out, 2, 4);
    assert_eq!(grad.dim(), (1, 2, 4, 1));
    for i in 0..2 {
        for j in 0..4 {
            assert_abs_diff_eq!(grad[[0, i, j, 0]], 1.0, epsilon = 1e-6);
        }
    }
}
