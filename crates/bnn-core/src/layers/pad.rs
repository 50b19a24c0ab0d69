//! Padding
//!
//! `[M][I][I]` → `[M][I+P][I+P]`。内部は入力をそのままコピーし、
//! 周縁 P/2 画素は `PadFill` のビットで明示的に埋める。

use crate::tensor::{BitTensor, Shape3};
use serde::{Deserialize, Serialize};

/// パディングで埋めるビット値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadFill {
    /// bit 0（bipolar -1）
    #[default]
    Zero,
    /// bit 1（bipolar +1）
    One,
}

impl PadFill {
    #[inline]
    pub const fn bit(self) -> bool {
        matches!(self, PadFill::One)
    }
}

/// パディング後の形状
#[inline]
pub const fn padded_shape(shape: Shape3, pad: usize) -> Shape3 {
    Shape3::new(shape.channels, shape.height + pad, shape.width + pad)
}

/// 特徴マップの周囲を `fill` で埋める
///
/// `pad` は両側の合計（偶数）。出力バッファは全体を `fill` で初期化してから
/// 内部を上書きするため、未初期化の領域は残らない。
pub fn pad(input: &BitTensor, pad: usize, fill: PadFill) -> BitTensor {
    debug_assert!(pad % 2 == 0, "pad amount must be even: {pad}");
    let shape = input.shape();
    let half = pad / 2;

    let mut output = BitTensor::filled(padded_shape(shape, pad), fill.bit());
    for y in 0..shape.height {
        for x in 0..shape.width {
            output
                .pixel_mut(y + half, x + half)
                .copy_from_slice(input.pixel(y, x));
        }
    }
    output
}
