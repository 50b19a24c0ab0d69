//! BNN 推論のエラー型
//!
//! 推論そのものは全域関数であり、失敗するのは構成（形状・パラメータ）の不整合のみ。
//! 構成エラーはネットワーク構築時に検出し、推論ごとの検査は入力画像の形状だけにする。

use crate::tensor::Shape3;

/// BNN 固有のエラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BnnError {
    /// アーキテクチャ記述子そのものが不正（奇数パディング、カーネル過大など）
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    /// テンソル形状の不一致
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: Shape3,
        actual: Shape3,
    },

    /// ベクトル長・要素数の不一致
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Flatten の添字写像が全単射でない
    #[error("Flatten layout is not a bijection: {0}")]
    FlattenNotBijective(String),

    /// 入力画像の形状が宣言されたアーキテクチャと一致しない
    #[error("Image shape mismatch: expected {expected}, got {actual}")]
    ImageShape { expected: Shape3, actual: Shape3 },
}

/// Result type for BNN operations
pub type BnnResult<T> = Result<T, BnnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shape_mismatch() {
        let err = BnnError::ShapeMismatch {
            what: "conv1 weights",
            expected: Shape3::new(1, 16, 16),
            actual: Shape3::new(1, 16, 15),
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch for conv1 weights: expected [1][16][16], got [1][16][15]"
        );
    }

    #[test]
    fn test_display_length_mismatch() {
        let err = BnnError::LengthMismatch {
            what: "conv2 thresholds",
            expected: 32,
            actual: 31,
        };
        assert!(err.to_string().contains("expected 32, got 31"));
    }
}
