//! ラインバッファ / スライディングウィンドウ
//!
//! 畳み込みの入力再利用構造。
//!
//! ```text
//! 入力テンソル ──(1行ずつ push_row)──▶ LineBuffer [F 行 × W 画素]
//!                                          │ (1列ずつ push_column)
//!                                          ▼
//!                                   SlidingWindow [F × F 画素]
//! ```
//!
//! どちらもリングバッファで、push は最古の行/列を追い出して新しいものを入れる。
//! 添字 0 が常に最古（= カーネルの 0 行目/0 列目）になるよう `head` で読み替える。
//! 1画素は `wpp` ワード（チャネル方向のビット列）。

use crate::tensor::BitTensor;

// =============================================================================
// LineBuffer
// =============================================================================

/// 直近 `rows` 行を保持するラインバッファ
#[derive(Debug, Clone)]
pub struct LineBuffer {
    rows: usize,
    width: usize,
    wpp: usize,
    /// 最古の行が入っているスロット
    head: usize,
    /// 保持している行数（最大 rows）
    len: usize,
    data: Vec<u64>,
}

impl LineBuffer {
    pub fn new(rows: usize, width: usize, wpp: usize) -> Self {
        Self {
            rows,
            width,
            wpp,
            head: 0,
            len: 0,
            data: vec![0; rows * width * wpp],
        }
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
    pub fn is_full(&self) -> bool {
        self.len == self.rows
    }

    #[inline]
    fn stride(&self) -> usize {
        self.width * self.wpp
    }

    /// 1行分のワード列を追加する（満杯なら最古の行を追い出す）
    pub fn push_row_words(&mut self, row: &[u64]) {
        debug_assert_eq!(row.len(), self.stride());
        let slot = if self.is_full() {
            let slot = self.head;
            self.head = (self.head + 1) % self.rows;
            slot
        } else {
            self.len += 1;
            (self.head + self.len - 1) % self.rows
        };
        let stride = self.stride();
        self.data[slot * stride..(slot + 1) * stride].copy_from_slice(row);
    }

    /// 入力テンソルの `y` 行目を追加する
    #[inline]
    pub fn push_row(&mut self, input: &BitTensor, y: usize) {
        self.push_row_words(input.row(y));
    }

    /// 論理行 `r`（0 = 最古）の画素 `x`
    #[inline]
    pub fn pixel(&self, r: usize, x: usize) -> &[u64] {
        debug_assert!(r < self.len && x < self.width);
        let slot = (self.head + r) % self.rows;
        let off = slot * self.stride() + x * self.wpp;
        &self.data[off..off + self.wpp]
    }
}

// =============================================================================
// SlidingWindow
// =============================================================================

/// F×F の畳み込み窓（列単位のリングバッファ）
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    size: usize,
    wpp: usize,
    /// 最古（左端）の列が入っているスロット
    head: usize,
    len: usize,
    /// data[(slot * size + r) * wpp + w]
    data: Vec<u64>,
}

impl SlidingWindow {
    pub fn new(size: usize, wpp: usize) -> Self {
        Self {
            size,
            wpp,
            head: 0,
            len: 0,
            data: vec![0; size * size * wpp],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 窓を空にする（行の先頭に戻るとき）
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// ラインバッファの列 `x` を右端に追加する（満杯なら左端の列を追い出す）
    pub fn push_column(&mut self, lines: &LineBuffer, x: usize) {
        debug_assert_eq!(lines.len(), self.size);
        let slot = if self.len == self.size {
            let slot = self.head;
            self.head = (self.head + 1) % self.size;
            slot
        } else {
            self.len += 1;
            (self.head + self.len - 1) % self.size
        };
        let col_words = self.size * self.wpp;
        let col = &mut self.data[slot * col_words..(slot + 1) * col_words];
        for (r, dst) in col.chunks_exact_mut(self.wpp).enumerate() {
            dst.copy_from_slice(lines.pixel(r, x));
        }
    }

    /// 窓内の `(r, c)`（c = 0 が最古の列）
    #[inline]
    pub fn pixel(&self, r: usize, c: usize) -> &[u64] {
        debug_assert!(r < self.size && c < self.len);
        let slot = (self.head + c) % self.size;
        let off = (slot * self.size + r) * self.wpp;
        &self.data[off..off + self.wpp]
    }
}
