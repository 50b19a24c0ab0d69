//! Max Pooling（2×2）
//!
//! 1bit の max は OR。`[M][I][I]` → `[M][I/2][I/2]`。

use crate::tensor::{BitTensor, Shape3};

/// 2×2 OR プーリング
pub fn max_pool_2x2(input: &BitTensor) -> BitTensor {
    let shape = input.shape();
    debug_assert!(shape.height % 2 == 0 && shape.width % 2 == 0);

    let out_shape = Shape3::new(shape.channels, shape.height / 2, shape.width / 2);
    let mut output = BitTensor::zeros(out_shape);

    for y in 0..out_shape.height {
        for x in 0..out_shape.width {
            let dst = output.pixel_mut(y, x);
            for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                for (d, s) in dst.iter_mut().zip(input.pixel(2 * y + r, 2 * x + c)) {
                    *d |= *s;
                }
            }
        }
    }
    output
}
