//! ビットテンソル / ビットベクトル
//!
//! 全ての活性値・重みは 1bit（bipolar 符号化: 0 = -1, 1 = +1）。
//!
//! # メモリレイアウト
//!
//! ```text
//! BitTensor [C][H][W]（論理添字）
//!   words[(y * W + x) * wpp + (c / 64)] の bit (c % 64)
//!   wpp = ceil(C / 64)   （1画素あたりの u64 ワード数）
//! ```
//!
//! 1画素のチャネル方向ビットが連続したワード列になるため、
//! XNOR-popcount が `count_ones()` 数回で済む。未使用の上位ビットは常に 0。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1ワードのビット数
pub const WORD_BITS: usize = 64;

/// `bits` 個のビットを格納するのに必要なワード数
#[inline]
pub const fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// `total_bits` ビット幅のビット列における `word` 番目ワードの有効ビットマスク
#[inline]
pub const fn word_mask(total_bits: usize, word: usize) -> u64 {
    let used = total_bits - word * WORD_BITS;
    if used >= WORD_BITS { u64::MAX } else { (1u64 << used) - 1 }
}

/// bipolar 値への変換（0 → -1, 1 → +1）
#[inline]
pub const fn bipolar(bit: bool) -> i32 {
    if bit { 1 } else { -1 }
}

// =============================================================================
// Shape3
// =============================================================================

/// 3次元テンソル形状 `[channels][height][width]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape3 {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape3 {
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// 正方形の特徴マップ `[channels][size][size]`
    pub const fn square(channels: usize, size: usize) -> Self {
        Self::new(channels, size, size)
    }

    /// 要素数（C * H * W）
    #[inline]
    pub const fn len(&self) -> usize {
        self.channels * self.height * self.width
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 1画素あたりのワード数
    #[inline]
    pub const fn words_per_pixel(&self) -> usize {
        words_for(self.channels)
    }
}

impl fmt::Display for Shape3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}][{}]", self.channels, self.height, self.width)
    }
}

// =============================================================================
// BitTensor
// =============================================================================

/// 3次元ビットテンソル（特徴マップ）
#[derive(Clone, PartialEq, Eq)]
pub struct BitTensor {
    shape: Shape3,
    wpp: usize,
    words: Vec<u64>,
}

impl BitTensor {
    /// 全ビット 0（bipolar -1）で作成
    pub fn zeros(shape: Shape3) -> Self {
        let wpp = shape.words_per_pixel();
        Self {
            shape,
            wpp,
            words: vec![0; shape.height * shape.width * wpp],
        }
    }

    /// 全ビットを `bit` で埋めて作成
    pub fn filled(shape: Shape3, bit: bool) -> Self {
        let mut t = Self::zeros(shape);
        if bit {
            let wpp = t.wpp;
            for pixel in t.words.chunks_exact_mut(wpp.max(1)) {
                for (w, word) in pixel.iter_mut().enumerate() {
                    *word = word_mask(shape.channels, w);
                }
            }
        }
        t
    }

    /// `f(channel, row, col)` で各ビットを決めて作成
    pub fn from_fn(shape: Shape3, mut f: impl FnMut(usize, usize, usize) -> bool) -> Self {
        let mut t = Self::zeros(shape);
        for c in 0..shape.channels {
            for y in 0..shape.height {
                for x in 0..shape.width {
                    if f(c, y, x) {
                        t.set(c, y, x, true);
                    }
                }
            }
        }
        t
    }

    #[inline]
    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    #[inline]
    pub fn words_per_pixel(&self) -> usize {
        self.wpp
    }

    #[inline]
    fn pixel_offset(&self, y: usize, x: usize) -> usize {
        debug_assert!(y < self.shape.height && x < self.shape.width);
        (y * self.shape.width + x) * self.wpp
    }

    /// `[c][y][x]` のビットを取得
    #[inline]
    pub fn get(&self, c: usize, y: usize, x: usize) -> bool {
        debug_assert!(c < self.shape.channels);
        let word = self.words[self.pixel_offset(y, x) + c / WORD_BITS];
        (word >> (c % WORD_BITS)) & 1 == 1
    }

    /// `[c][y][x]` のビットを設定
    #[inline]
    pub fn set(&mut self, c: usize, y: usize, x: usize, bit: bool) {
        debug_assert!(c < self.shape.channels);
        let idx = self.pixel_offset(y, x) + c / WORD_BITS;
        let mask = 1u64 << (c % WORD_BITS);
        if bit {
            self.words[idx] |= mask;
        } else {
            self.words[idx] &= !mask;
        }
    }

    /// 画素 `(y, x)` の全チャネルのビット（ワード列）
    #[inline]
    pub fn pixel(&self, y: usize, x: usize) -> &[u64] {
        let off = self.pixel_offset(y, x);
        &self.words[off..off + self.wpp]
    }

    #[inline]
    pub(crate) fn pixel_mut(&mut self, y: usize, x: usize) -> &mut [u64] {
        let off = self.pixel_offset(y, x);
        &mut self.words[off..off + self.wpp]
    }

    /// 1出力行あたりのワード数
    #[inline]
    pub(crate) fn row_stride(&self) -> usize {
        self.shape.width * self.wpp
    }

    /// `y` 行目の全画素のワード列
    #[inline]
    pub(crate) fn row(&self, y: usize) -> &[u64] {
        debug_assert!(y < self.shape.height);
        let stride = self.row_stride();
        &self.words[y * stride..(y + 1) * stride]
    }

    #[inline]
    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// 立っているビット数
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl fmt::Debug for BitTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitTensor")
            .field("shape", &self.shape)
            .field("ones", &self.count_ones())
            .finish()
    }
}

// =============================================================================
// BitVec
// =============================================================================

/// 1次元ビットベクトル（Dense 層の入出力）
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BitVec {
    len: usize,
    words: Vec<u64>,
}

impl BitVec {
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            words: vec![0; words_for(len)],
        }
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        bits.iter().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, i: usize, bit: bool) {
        debug_assert!(i < self.len);
        let mask = 1u64 << (i % WORD_BITS);
        if bit {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    /// 内部ワード列（末尾ワードの未使用ビットは 0）
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut len = 0;
        let mut words = Vec::new();
        for bit in iter {
            if len % WORD_BITS == 0 {
                words.push(0);
            }
            if bit {
                words[len / WORD_BITS] |= 1u64 << (len % WORD_BITS);
            }
            len += 1;
        }
        Self { len, words }
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = self.iter().map(|b| if b { '1' } else { '0' }).collect();
        write!(f, "BitVec[{}]({bits})", self.len)
    }
}
