/*
 * @Author       : 老董
 * @Date         : 2026-07-14
 * @Description  : 无偏置 2D 卷积（SAME 填充）
 *
 * 形状约定（NHWC）：
 * - 输入：[batch, H, W, C_in]
 * - 卷积核：[kH, kW, C_in, C_out]
 * - 输出：[batch, H', W', C_out]，SAME 填充下 H' = ceil(H / stride)
 *
 * SAME 填充总量 = max((H'-1)*stride + kH - H, 0)，不对称时多出的一行/列
 * 填在下/右侧。使用 Rayon 在 batch 维度并行。
 */

use ndarray::{Array3, Array4, Axis, Ix4, s};
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::nn::{FeatureMap, Init, NetError, ParamId, ParamStore, RegularizationPool};

/// 卷积核初始化的标准差
const KERNEL_INIT_STD: f32 = 5e-2;

/// 无偏置 2D 卷积层
///
/// 每个卷积核在创建时向所给的正则池登记一条 L2 惩罚项（系数 = weight_decay）。
pub struct Conv2d {
    /// 卷积核参数 [kH, kW, C_in, C_out]
    kernel: ParamId,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    /// 反向传播缓存：填充后的输入
    padded_input: Option<Array4<f32>>,
    /// 反向传播缓存：本次前向的填充量 (top, left) 与原始输入尺寸
    fwd_geometry: Option<ConvGeometry>,
}

#[derive(Clone, Copy)]
struct ConvGeometry {
    pad_top: usize,
    pad_left: usize,
    input_h: usize,
    input_w: usize,
}

impl Conv2d {
    /// 创建卷积层并登记卷积核参数
    ///
    /// # 参数
    /// - `store`: 参数仓库
    /// - `pool`: 正则池（卷积核的 L2 项登记于此）
    /// - `name`: 参数名前缀
    /// - `weight_decay`: L2 正则系数
    pub fn new(
        store: &mut ParamStore,
        pool: &mut RegularizationPool,
        name: &str,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        weight_decay: f32,
        rng: &mut StdRng,
    ) -> Result<Self, NetError> {
        if kernel_size == 0 || stride == 0 {
            return Err(NetError::InvalidConfig(format!(
                "卷积核大小与步长必须大于 0，得到 kernel_size={kernel_size}, stride={stride}"
            )));
        }
        let kernel = store.register(
            &format!("{name}/kernel"),
            &[kernel_size, kernel_size, in_channels, out_channels],
            Init::Normal {
                std: KERNEL_INIT_STD,
            },
            rng,
        )?;
        pool.register(kernel, weight_decay);

        Ok(Self {
            kernel,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padded_input: None,
            fwd_geometry: None,
        })
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// 卷积核参数句柄
    pub fn kernel(&self) -> ParamId {
        self.kernel
    }

    /// SAME 填充下的输出尺寸与填充量：(out, pad_before, pad_after)
    fn same_padding(input: usize, kernel: usize, stride: usize) -> (usize, usize, usize) {
        let out = input.div_ceil(stride);
        let pad_total = ((out - 1) * stride + kernel).saturating_sub(input);
        let pad_before = pad_total / 2;
        (out, pad_before, pad_total - pad_before)
    }

    /// 前向传播
    ///
    /// 仅训练模式缓存反向传播所需的中间量；推理模式会清掉既有缓存，
    /// 保证缓存永远来自同一次训练前向。
    pub fn forward(
        &mut self,
        store: &ParamStore,
        x: &FeatureMap,
        training: bool,
    ) -> Result<FeatureMap, NetError> {
        let (batch, in_h, in_w, in_c) = x.dim();
        if in_c != self.in_channels {
            return Err(NetError::ShapeMismatch {
                expected: vec![batch, in_h, in_w, self.in_channels],
                got: x.shape().to_vec(),
                message: "卷积输入通道数与卷积核不匹配".to_string(),
            });
        }

        let k = self.kernel_size;
        let (out_h, pad_top, pad_bottom) = Self::same_padding(in_h, k, self.stride);
        let (out_w, pad_left, pad_right) = Self::same_padding(in_w, k, self.stride);

        // 零填充
        let mut padded = Array4::<f32>::zeros((
            batch,
            in_h + pad_top + pad_bottom,
            in_w + pad_left + pad_right,
            in_c,
        ));
        padded
            .slice_mut(s![.., pad_top..pad_top + in_h, pad_left..pad_left + in_w, ..])
            .assign(x);

        let kernel = store
            .value(self.kernel)
            .view()
            .into_dimensionality::<Ix4>()
            .expect("卷积核必须是 4D 张量");
        let stride = self.stride;
        let out_c = self.out_channels;

        // batch 维度并行
        let per_sample: Vec<Array3<f32>> = (0..batch)
            .into_par_iter()
            .map(|b| {
                let sample = padded.index_axis(Axis(0), b);
                let mut out = Array3::<f32>::zeros((out_h, out_w, out_c));
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        for kh in 0..k {
                            for kw in 0..k {
                                let (ih, iw) = (oh * stride + kh, ow * stride + kw);
                                for ic in 0..in_c {
                                    let v = sample[[ih, iw, ic]];
                                    if v == 0.0 {
                                        continue;
                                    }
                                    for oc in 0..out_c {
                                        out[[oh, ow, oc]] += v * kernel[[kh, kw, ic, oc]];
                                    }
                                }
                            }
                        }
                    }
                }
                out
            })
            .collect();

        let views: Vec<_> = per_sample.iter().map(|a| a.view()).collect();
        let output = ndarray::stack(Axis(0), &views).expect("卷积输出拼接失败");

        if training {
            self.padded_input = Some(padded);
            self.fwd_geometry = Some(ConvGeometry {
                pad_top,
                pad_left,
                input_h: in_h,
                input_w: in_w,
            });
        } else {
            self.padded_input = None;
            self.fwd_geometry = None;
        }
        Ok(output)
    }

    /// 反向传播：累加卷积核梯度，返回对输入的梯度
    pub fn backward(
        &mut self,
        store: &mut ParamStore,
        grad_out: &FeatureMap,
    ) -> Result<FeatureMap, NetError> {
        let padded = self.padded_input.as_ref().ok_or_else(|| {
            NetError::ComputationError("卷积反向传播前必须先执行前向传播".to_string())
        })?;
        let geometry = self.fwd_geometry.expect("前向缓存与几何信息同时写入");

        let (batch, out_h, out_w, out_c) = grad_out.dim();
        let (_, pad_h, pad_w, in_c) = padded.dim();
        let k = self.kernel_size;
        let stride = self.stride;

        let kernel = store
            .value(self.kernel)
            .view()
            .into_dimensionality::<Ix4>()
            .expect("卷积核必须是 4D 张量")
            .to_owned();

        // 卷积核梯度：逐样本算局部梯度再求和
        let grad_kernel = (0..batch)
            .into_par_iter()
            .map(|b| {
                let sample = padded.index_axis(Axis(0), b);
                let g = grad_out.index_axis(Axis(0), b);
                let mut gk = Array4::<f32>::zeros((k, k, in_c, out_c));
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        for kh in 0..k {
                            for kw in 0..k {
                                let (ih, iw) = (oh * stride + kh, ow * stride + kw);
                                for ic in 0..in_c {
                                    let v = sample[[ih, iw, ic]];
                                    if v == 0.0 {
                                        continue;
                                    }
                                    for oc in 0..out_c {
                                        gk[[kh, kw, ic, oc]] += v * g[[oh, ow, oc]];
                                    }
                                }
                            }
                        }
                    }
                }
                gk
            })
            .reduce(
                || Array4::<f32>::zeros((k, k, in_c, out_c)),
                |mut acc, gk| {
                    acc += &gk;
                    acc
                },
            );

        // 对（填充后）输入的梯度
        let per_sample: Vec<Array3<f32>> = (0..batch)
            .into_par_iter()
            .map(|b| {
                let g = grad_out.index_axis(Axis(0), b);
                let mut gi = Array3::<f32>::zeros((pad_h, pad_w, in_c));
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        for kh in 0..k {
                            for kw in 0..k {
                                let (ih, iw) = (oh * stride + kh, ow * stride + kw);
                                for oc in 0..out_c {
                                    let gv = g[[oh, ow, oc]];
                                    if gv == 0.0 {
                                        continue;
                                    }
                                    for ic in 0..in_c {
                                        gi[[ih, iw, ic]] += gv * kernel[[kh, kw, ic, oc]];
                                    }
                                }
                            }
                        }
                    }
                }
                gi
            })
            .collect();

        let views: Vec<_> = per_sample.iter().map(|a| a.view()).collect();
        let grad_padded = ndarray::stack(Axis(0), &views).expect("输入梯度拼接失败");

        // 去掉填充部分
        let ConvGeometry {
            pad_top,
            pad_left,
            input_h,
            input_w,
        } = geometry;
        let grad_input = grad_padded
            .slice(s![
                ..,
                pad_top..pad_top + input_h,
                pad_left..pad_left + input_w,
                ..
            ])
            .to_owned();

        *store.grad_mut(self.kernel) += &grad_kernel.into_dyn();

        self.padded_input = None;
        self.fwd_geometry = None;
        Ok(grad_input)
    }
}
