//! 二値畳み込み（XNOR-popcount-threshold）
//!
//! `[M][I][I]` × `[M][N][F][F]` → `[N][I-F+1][I-F+1]`
//!
//! 出力 `(n, y, x)` ごとに
//!
//! ```text
//! acc = 2 * count_equal - K      (K = M * F * F)
//! out = acc > threshold[n]
//! ```
//!
//! # 入力の再利用
//!
//! 入力は `LineBuffer` 経由で 1 行につき 1 回だけ読み、出力位置の移動は
//! `SlidingWindow` への 1 列 push で済ませる。テンソル本体を画素ごとに
//! F×F×M 回読み直すことはない。走査順は (y, x) の row-major、n が最内。

use super::line_buffer::{LineBuffer, SlidingWindow};
use super::xnor::{bipolar_sum, count_diff};
use crate::tensor::{BitTensor, Shape3, WORD_BITS};
use crate::weights::ConvWeights;
use std::ops::Range;

/// 畳み込み出力の形状
#[inline]
pub const fn conv_output_shape(input: Shape3, out_channels: usize, kernel_size: usize) -> Shape3 {
    Shape3::new(
        out_channels,
        input.height + 1 - kernel_size,
        input.width + 1 - kernel_size,
    )
}

/// 二値畳み込み
///
/// 形状の整合性（`weights.in_channels() == input.channels`、`F <= I`、
/// `thresholds.len() == N`）は呼び出し側で検証済みであること。
pub fn binary_conv2d(input: &BitTensor, weights: &ConvWeights, thresholds: &[i32]) -> BitTensor {
    let in_shape = input.shape();
    debug_assert_eq!(weights.in_channels(), in_shape.channels);
    debug_assert_eq!(weights.out_channels(), thresholds.len());
    debug_assert!(weights.kernel_size() <= in_shape.height.min(in_shape.width));

    let out_shape = conv_output_shape(in_shape, weights.out_channels(), weights.kernel_size());
    let mut output = BitTensor::zeros(out_shape);
    if output.words_mut().is_empty() {
        return output;
    }

    #[cfg(feature = "parallel")]
    conv_rows_parallel(input, weights, thresholds, &mut output);

    #[cfg(not(feature = "parallel"))]
    {
        let rows = 0..out_shape.height;
        let out_w = out_shape.width;
        conv_rows(input, weights, thresholds, rows, out_w, output.words_mut());
    }

    output
}

/// 出力行バンドを rayon で並列計算する
///
/// バンドごとに独立したラインバッファを持つ。出力は行単位で連続しているため
/// `par_chunks_mut` で重なりなく分割できる。
#[cfg(feature = "parallel")]
fn conv_rows_parallel(
    input: &BitTensor,
    weights: &ConvWeights,
    thresholds: &[i32],
    output: &mut BitTensor,
) {
    use rayon::prelude::*;

    let out_shape = output.shape();
    let stride = output.row_stride();
    let rows_per_band = band_rows(out_shape.height, rayon::current_num_threads());

    output
        .words_mut()
        .par_chunks_mut(rows_per_band * stride)
        .enumerate()
        .for_each(|(band, chunk)| {
            let start = band * rows_per_band;
            let rows = start..start + chunk.len() / stride;
            conv_rows(input, weights, thresholds, rows, out_shape.width, chunk);
        });
}

/// `height` 行を `parts` 個以下のバンドに分けるときの 1 バンドの行数
#[cfg_attr(not(feature = "parallel"), allow(dead_code))]
fn band_rows(height: usize, parts: usize) -> usize {
    height.div_ceil(parts.max(1)).max(1)
}

/// 出力行 `rows` を計算して `out`（`rows.start` 行目から始まるワード列）に書く
fn conv_rows(
    input: &BitTensor,
    weights: &ConvWeights,
    thresholds: &[i32],
    rows: Range<usize>,
    out_w: usize,
    out: &mut [u64],
) {
    let f = weights.kernel_size();
    let n_out = weights.out_channels();
    let k = weights.fan_in();
    let in_w = input.shape().width;
    let wpp = input.words_per_pixel();
    let out_wpp = n_out.div_ceil(WORD_BITS);

    // ラインバッファに先頭 F 行を読み込む
    let mut lines = LineBuffer::new(f, in_w, wpp);
    for r in 0..f {
        lines.push_row(input, rows.start + r);
    }
    let mut window = SlidingWindow::new(f, wpp);

    for (i, y) in rows.enumerate() {
        if i > 0 {
            // 最古の行を追い出して次の行を入れる
            lines.push_row(input, y + f - 1);
        }

        // 行頭で窓を F 列ぶん埋め直す
        window.clear();
        for c in 0..f {
            window.push_column(&lines, c);
        }

        for x in 0..out_w {
            if x > 0 {
                window.push_column(&lines, x + f - 1);
            }

            let off = (i * out_w + x) * out_wpp;
            let out_pixel = &mut out[off..off + out_wpp];
            for (n, &threshold) in thresholds.iter().enumerate() {
                let mut diff = 0;
                for r in 0..f {
                    for c in 0..f {
                        diff += count_diff(window.pixel(r, c), weights.kernel_pixel(n, r, c));
                    }
                }
                let acc = bipolar_sum(k as u32 - diff, k);
                if acc > threshold {
                    out_pixel[n / WORD_BITS] |= 1u64 << (n % WORD_BITS);
                }
            }
        }
    }
}

/// 出力画素ごとに全 K 項を入力テンソルから読み直す素朴な実装（検証用）
pub fn binary_conv2d_reference(
    input: &BitTensor,
    weights: &ConvWeights,
    thresholds: &[i32],
) -> BitTensor {
    let f = weights.kernel_size();
    let m_in = weights.in_channels();
    let k = weights.fan_in();
    let out_shape = conv_output_shape(input.shape(), weights.out_channels(), f);

    BitTensor::from_fn(out_shape, |n, y, x| {
        let mut equal = 0u32;
        for m in 0..m_in {
            for r in 0..f {
                for c in 0..f {
                    if input.get(m, y + r, x + c) == weights.get(m, n, r, c) {
                        equal += 1;
                    }
                }
            }
        }
        bipolar_sum(equal, k) > thresholds[n]
    })
}
