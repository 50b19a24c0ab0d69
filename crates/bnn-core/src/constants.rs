//! 参照モデル（手書き数字 BNN）の次元定数
//!
//! `Architecture::reference()` はこの値から組み立てる。

// =============================================================================
// 入力
// =============================================================================

/// 入力画像の一辺（16×16 の 1bit 画像）
pub const INPUT_WIDTH: usize = 16;

/// 入力チャネル数
pub const INPUT_CHANNELS: usize = 1;

// =============================================================================
// 畳み込み層
// =============================================================================

/// カーネルサイズ F
pub const KERNEL_SIZE: usize = 3;

/// パディング量（両側合計、各辺 PAD / 2）
pub const PAD: usize = 2;

/// 第1畳み込み層の出力チャネル数
pub const CONV1_CHANNELS: usize = 16;

/// 第2畳み込み層の出力チャネル数
pub const CONV2_CHANNELS: usize = 32;

/// 第1プーリング後の一辺（16 → 8）
pub const POOL1_WIDTH: usize = INPUT_WIDTH / 2;

/// 第2プーリング後の一辺（8 → 4）
pub const POOL2_WIDTH: usize = POOL1_WIDTH / 2;

// =============================================================================
// 全結合層
// =============================================================================

/// Flatten 後の次元（32 × 4 × 4 = 512）
pub const FLAT_UNITS: usize = CONV2_CHANNELS * POOL2_WIDTH * POOL2_WIDTH;

/// 隠れ層の次元
pub const HIDDEN_UNITS: usize = 256;

/// クラス数（数字 0-9）
pub const NUM_DIGITS: usize = 10;

// =============================================================================
// Flatten の bit slice（参照モデル）
// =============================================================================

/// flat index の bit 0..5 がチャネル
pub const FLATTEN_CHANNEL_MASK: usize = 0b0_0001_1111;

/// flat index の bit 5..7 が列
pub const FLATTEN_COL_MASK: usize = 0b0_0110_0000;

/// flat index の bit 7..9 が行
pub const FLATTEN_ROW_MASK: usize = 0b1_1000_0000;

pub const FLATTEN_COL_SHIFT: u32 = 5;
pub const FLATTEN_ROW_SHIFT: u32 = 7;
