/*
 * @Author       : 老董
 * @Date         : 2026-07-16
 * @Description  : 平均池化：2x2/步长 2 的非重叠池化与全局平均池化
 *
 * 池化没有可学习参数，这里用成对的 forward/backward 自由函数表达。
 */

use ndarray::{Array2, Array4};

use crate::nn::{FeatureMap, NetError};

/// 2x2、步长 2 的非重叠平均池化
///
/// 输出高宽各为输入的一半。
///
/// # 错误
/// 输入高或宽为奇数时返回 `DimensionNotDivisible`（按约定显式失败而非静默截断）。
pub fn avg_pool2d_2x2(x: &FeatureMap) -> Result<FeatureMap, NetError> {
    let (batch, h, w, c) = x.dim();
    if h % 2 != 0 || w % 2 != 0 {
        return Err(NetError::DimensionNotDivisible {
            height: h,
            width: w,
        });
    }
    let (out_h, out_w) = (h / 2, w / 2);

    let mut output = Array4::<f32>::zeros((batch, out_h, out_w, c));
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                for ch in 0..c {
                    let sum = x[[b, 2 * oh, 2 * ow, ch]]
                        + x[[b, 2 * oh, 2 * ow + 1, ch]]
                        + x[[b, 2 * oh + 1, 2 * ow, ch]]
                        + x[[b, 2 * oh + 1, 2 * ow + 1, ch]];
                    output[[b, oh, ow, ch]] = sum / 4.0;
                }
            }
        }
    }
    Ok(output)
}

/// 2x2 平均池化的反向传播：梯度均摊回 2x2 窗口的 4 个位置
pub fn avg_pool2d_2x2_backward(grad_out: &FeatureMap) -> FeatureMap {
    let (batch, out_h, out_w, c) = grad_out.dim();
    let mut grad = Array4::<f32>::zeros((batch, out_h * 2, out_w * 2, c));
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                for ch in 0..c {
                    let g = grad_out[[b, oh, ow, ch]] / 4.0;
                    grad[[b, 2 * oh, 2 * ow, ch]] = g;
                    grad[[b, 2 * oh, 2 * ow + 1, ch]] = g;
                    grad[[b, 2 * oh + 1, 2 * ow, ch]] = g;
                    grad[[b, 2 * oh + 1, 2 * ow + 1, ch]] = g;
                }
            }
        }
    }
    grad
}

/// 全局平均池化：对 H、W 两维求均值，[batch, H, W, C] → [batch, C]
pub fn global_avg_pool(x: &FeatureMap) -> Array2<f32> {
    let (batch, h, w, c) = x.dim();
    let n = (h * w) as f32;
    let mut output = Array2::<f32>::zeros((batch, c));
    for b in 0..batch {
        for ch in 0..c {
            let mut sum = 0.0;
            for i in 0..h {
                for j in 0..w {
                    sum += x[[b, i, j, ch]];
                }
            }
            output[[b, ch]] = sum / n;
        }
    }
    output
}

/// 全局平均池化的反向传播：梯度均摊回每个空间位置
pub fn global_avg_pool_backward(grad_out: &Array2<f32>, height: usize, width: usize) -> FeatureMap {
    let (batch, c) = grad_out.dim();
    let n = (height * width) as f32;
    let mut grad = Array4::<f32>::zeros((batch, height, width, c));
    for b in 0..batch {
        for ch in 0..c {
            let g = grad_out[[b, ch]] / n;
            for i in 0..height {
                for j in 0..width {
                    grad[[b, i, j, ch]] = g;
                }
            }
        }
    }
    grad
}
