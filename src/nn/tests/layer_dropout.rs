/*
 * @Author       : 老董
 * @Date         : 2026-07-20
 * @Description  : 按通道 dropout 单元测试
 */

use approx::assert_abs_diff_eq;
use ndarray::Array4;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::nn::NetError;
use crate::nn::layer::ChannelDropout;

/// rate = 0 时训练模式也是恒等映射
#[test]
fn test_zero_rate_is_identity() {
    let mut drop = ChannelDropout::new(0.0, StdRng::seed_from_u64(42)).unwrap();
    let x = Array4::from_shape_fn((2, 3, 3, 4), |(b, i, j, c)| (b + i + j + c) as f32);
    let output = drop.forward(&x, true);
    assert_eq!(output, x);
}

/// 推理模式永远是恒等映射，之后的反向也是恒等
#[test]
fn test_inference_is_identity() {
    let mut drop = ChannelDropout::new(0.5, StdRng::seed_from_u64(42)).unwrap();
    let x = Array4::from_elem((2, 2, 2, 3), 1.5);
    let output = drop.forward(&x, false);
    assert_eq!(output, x);

    let grad = drop.backward(&Array4::from_elem((2, 2, 2, 3), 2.0)).unwrap();
    assert_abs_diff_eq!(grad[[0, 0, 0, 0]], 2.0, epsilon = 1e-6);
}

/// 训练模式：整条通道要么置零、要么按 1/(1-rate) 放大
#[test]
fn test_whole_channel_dropped_or_scaled() {
    let rate = 0.5;
    let mut drop = ChannelDropout::new(rate, StdRng::seed_from_u64(7)).unwrap();
    let x = Array4::from_elem((4, 3, 3, 8), 1.0);
    let output = drop.forward(&x, true);

    let keep_scale = 1.0 / (1.0 - rate);
    let mut dropped = 0usize;
    let mut kept = 0usize;
    for b in 0..4 {
        for c in 0..8 {
            // 同一 (样本, 通道) 的所有空间位置共享一个掩码值
            let first = output[[b, 0, 0, c]];
            for i in 0..3 {
                for j in 0..3 {
                    assert_abs_diff_eq!(output[[b, i, j, c]], first, epsilon = 1e-6);
                }
            }
            if first == 0.0 {
                dropped += 1;
            } else {
                assert_abs_diff_eq!(first, keep_scale, epsilon = 1e-6);
                kept += 1;
            }
        }
    }
    // 32 个通道、rate=0.5：全保留或全丢弃的概率都是 2^-32，可忽略
    assert!(dropped > 0 && kept > 0);
}

/// 反向传播复用前向的掩码：梯度与输出的置零位置一致
#[test]
fn test_backward_reuses_forward_mask() {
    let mut drop = ChannelDropout::new(0.4, StdRng::seed_from_u64(3)).unwrap();
    let x = Array4::from_elem((2, 2, 2, 6), 1.0);
    let output = drop.forward(&x, true);
    let grad = drop.backward(&Array4::from_elem((2, 2, 2, 6), 1.0)).unwrap();
    // 输入与输出梯度皆全 1，掩码相同则两者逐元素相等
    assert_eq!(grad, output);
}

/// rate 不在 [0, 1) 内时拒绝创建
#[test]
fn test_invalid_rate_rejected() {
    assert!(matches!(
        ChannelDropout::new(1.0, StdRng::seed_from_u64(0)),
        Err(NetError::InvalidConfig(_))
    ));
    assert!(matches!(
        ChannelDropout::new(-0.1, StdRng::seed_from_u64(0)),
        Err(NetError::InvalidConfig(_))
    ));
}
