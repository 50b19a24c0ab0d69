//! BNN の各層
//!
//! 全ての層は入力を借用し、新しく確保した出力を返す（in-place 更新はしない）。
//! 形状の前提条件はネットワーク構築時に検証済みとし、ここでは `debug_assert!` のみ。

mod activation;
mod conv;
mod dense;
mod flatten;
mod line_buffer;
mod pad;
mod pool;
mod xnor;

pub use activation::{argmax, sign};
pub use conv::{binary_conv2d, binary_conv2d_reference, conv_output_shape};
pub use dense::binary_dense;
pub use flatten::{flatten, Axis, FlattenLayout, FlattenMap};
pub use line_buffer::{LineBuffer, SlidingWindow};
pub use pad::{pad, padded_shape, PadFill};
pub use pool::max_pool_2x2;
pub use xnor::{bipolar_dot, bipolar_sum, count_diff, count_equal};
