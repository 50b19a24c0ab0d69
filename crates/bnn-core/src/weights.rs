//! BNN 重み構造体
//!
//! 学習済み（凍結）パラメータ。起動時に一度だけ構築し、以降は読み取り専用で
//! 全推論から共有する。
//!
//! # レイアウト
//!
//! ```text
//! ConvWeights  論理 [M][N][F][F]
//!   packed[((n * F + r) * F + c) * wpp + m / 64] の bit (m % 64)
//!   → 出力チャネル n・カーネル位置 (r, c) ごとに入力チャネル方向のビット列
//!
//! DenseWeights 論理 [M][N]
//!   packed[n * wpc + m / 64] の bit (m % 64)
//!   → 出力ユニット n ごとの列ベクトル
//! ```
//!
//! いずれも活性値テンソルと同じ詰め方なので、XOR + popcount が直接使える。

use crate::tensor::{words_for, WORD_BITS};

// =============================================================================
// 畳み込み重み
// =============================================================================

/// 畳み込み層の重み `[in_channel][out_channel][kernel_row][kernel_col]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvWeights {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    wpp: usize,
    packed: Vec<u64>,
}

impl ConvWeights {
    /// 新規作成（ゼロ初期化 = 全て -1）
    pub fn zeros(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        let wpp = words_for(in_channels);
        Self {
            in_channels,
            out_channels,
            kernel_size,
            wpp,
            packed: vec![0; out_channels * kernel_size * kernel_size * wpp],
        }
    }

    /// `f(m, n, r, c)` で各ビットを決めて作成
    pub fn from_fn(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        mut f: impl FnMut(usize, usize, usize, usize) -> bool,
    ) -> Self {
        let mut w = Self::zeros(in_channels, out_channels, kernel_size);
        for m in 0..in_channels {
            for n in 0..out_channels {
                for r in 0..kernel_size {
                    for c in 0..kernel_size {
                        if f(m, n, r, c) {
                            w.set(m, n, r, c, true);
                        }
                    }
                }
            }
        }
        w
    }

    #[inline]
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    #[inline]
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    #[inline]
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// 1出力あたりの比較数 K = M * F * F
    #[inline]
    pub fn fan_in(&self) -> usize {
        self.in_channels * self.kernel_size * self.kernel_size
    }

    #[inline]
    fn offset(&self, n: usize, r: usize, c: usize) -> usize {
        debug_assert!(n < self.out_channels && r < self.kernel_size && c < self.kernel_size);
        ((n * self.kernel_size + r) * self.kernel_size + c) * self.wpp
    }

    #[inline]
    pub fn get(&self, m: usize, n: usize, r: usize, c: usize) -> bool {
        debug_assert!(m < self.in_channels);
        let word = self.packed[self.offset(n, r, c) + m / WORD_BITS];
        (word >> (m % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, m: usize, n: usize, r: usize, c: usize, bit: bool) {
        debug_assert!(m < self.in_channels);
        let idx = self.offset(n, r, c) + m / WORD_BITS;
        let mask = 1u64 << (m % WORD_BITS);
        if bit {
            self.packed[idx] |= mask;
        } else {
            self.packed[idx] &= !mask;
        }
    }

    /// 出力チャネル `n`、カーネル位置 `(r, c)` の入力チャネル方向ビット列
    #[inline]
    pub fn kernel_pixel(&self, n: usize, r: usize, c: usize) -> &[u64] {
        let off = self.offset(n, r, c);
        &self.packed[off..off + self.wpp]
    }
}

/// 畳み込み層（重み + BatchNorm を畳み込んだ閾値）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvLayer {
    pub weights: ConvWeights,

    /// 出力チャネルごとの閾値（`acc > threshold` で 1）
    pub thresholds: Vec<i32>,
}

impl ConvLayer {
    pub fn new(weights: ConvWeights, thresholds: Vec<i32>) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// 新規作成（ゼロ重み・ゼロ閾値）
    pub fn zeros(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self::new(
            ConvWeights::zeros(in_channels, out_channels, kernel_size),
            vec![0; out_channels],
        )
    }
}

// =============================================================================
// 全結合重み
// =============================================================================

/// 全結合層の重み `[in_unit][out_unit]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseWeights {
    in_units: usize,
    out_units: usize,
    /// 1列あたりのワード数
    wpc: usize,
    packed: Vec<u64>,
}

impl DenseWeights {
    /// 新規作成（ゼロ初期化）
    pub fn zeros(in_units: usize, out_units: usize) -> Self {
        let wpc = words_for(in_units);
        Self {
            in_units,
            out_units,
            wpc,
            packed: vec![0; out_units * wpc],
        }
    }

    /// `f(in_unit, out_unit)` で各ビットを決めて作成
    pub fn from_fn(
        in_units: usize,
        out_units: usize,
        mut f: impl FnMut(usize, usize) -> bool,
    ) -> Self {
        let mut w = Self::zeros(in_units, out_units);
        for i in 0..in_units {
            for o in 0..out_units {
                if f(i, o) {
                    w.set(i, o, true);
                }
            }
        }
        w
    }

    #[inline]
    pub fn in_units(&self) -> usize {
        self.in_units
    }

    #[inline]
    pub fn out_units(&self) -> usize {
        self.out_units
    }

    #[inline]
    pub fn get(&self, i: usize, o: usize) -> bool {
        debug_assert!(i < self.in_units && o < self.out_units);
        (self.packed[o * self.wpc + i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, i: usize, o: usize, bit: bool) {
        debug_assert!(i < self.in_units && o < self.out_units);
        let idx = o * self.wpc + i / WORD_BITS;
        let mask = 1u64 << (i % WORD_BITS);
        if bit {
            self.packed[idx] |= mask;
        } else {
            self.packed[idx] &= !mask;
        }
    }

    /// 出力ユニット `o` の列（入力方向のビット列）
    #[inline]
    pub fn column(&self, o: usize) -> &[u64] {
        &self.packed[o * self.wpc..(o + 1) * self.wpc]
    }
}

// =============================================================================
// モデル全体
// =============================================================================

/// 2 畳み込み + 2 全結合のモデル重み
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelWeights {
    pub conv1: ConvLayer,
    pub conv2: ConvLayer,
    pub fc1: DenseWeights,
    pub fc2: DenseWeights,
}
