/*
 * @Author       : 老董
 * @Date         : 2026-07-14
 * @Description  : 网络层：卷积、归一化、丢弃、dense 单元/块、过渡层、池化与全连接
 *
 * 所有层都是显式 forward/backward 的逐步可调用形式：
 * - forward 读 ParamStore 中的参数值，缓存反向传播所需的中间量
 * - backward 消费缓存，把参数梯度累加进 ParamStore，返回对输入的梯度
 */

mod avg_pool2d;
mod batch_norm;
mod conv2d;
mod dense_block;
mod dropout;
mod linear;
mod transition;
mod unit;

pub use avg_pool2d::{avg_pool2d_2x2, avg_pool2d_2x2_backward, global_avg_pool, global_avg_pool_backward};
pub use batch_norm::BatchNorm;
pub use conv2d::Conv2d;
pub use dense_block::DenseBlock;
pub use dropout::ChannelDropout;
pub use linear::Linear;
pub use transition::TransitionLayer;
pub use unit::{UnitHyper, UnitLayer};
