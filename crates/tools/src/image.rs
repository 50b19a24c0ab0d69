//! 入力画像の読み込み
//!
//! 2 つの形式を受け付ける。
//!
//! - words: 32bit little-endian ワード列。ワード `i` の bit `j`（LSB から）が
//!   画素 `k = i * 32 + j`。`k` は row-major（`row = k / W`, `col = k % W`）で、
//!   複数チャネルならチャネルごとの平面が順に並ぶ。
//! - text: `0` / `1` の文字列。空白・改行は無視する。

use crate::io::read_all;
use anyhow::{bail, Context, Result};
use bnn_core::{BitTensor, Shape3};
use std::path::Path;

/// ワード1つあたりの画素数
pub const PIXELS_PER_WORD: usize = 32;

/// 画像ファイル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ImageFormat {
    /// 32bit LE ワード列（LSB-first, row-major）
    #[default]
    Words,
    /// `0`/`1` のテキスト
    Text,
}

/// ワード列から画像を復元する
pub fn decode_words(words: &[u32], shape: Shape3) -> Result<BitTensor> {
    let pixels = shape.len();
    if pixels % PIXELS_PER_WORD != 0 {
        bail!("image {shape} has {pixels} pixels, not a multiple of {PIXELS_PER_WORD}");
    }
    let expected = pixels / PIXELS_PER_WORD;
    if words.len() != expected {
        bail!("expected {expected} words for image {shape}, got {}", words.len());
    }

    let plane = shape.height * shape.width;
    Ok(BitTensor::from_fn(shape, |c, y, x| {
        let k = c * plane + y * shape.width + x;
        (words[k / PIXELS_PER_WORD] >> (k % PIXELS_PER_WORD)) & 1 == 1
    }))
}

/// 画像をワード列に詰める（`decode_words` の逆）
pub fn encode_words(image: &BitTensor) -> Vec<u32> {
    let shape = image.shape();
    let plane = shape.height * shape.width;
    let mut words = vec![0u32; shape.len().div_ceil(PIXELS_PER_WORD)];
    for c in 0..shape.channels {
        for y in 0..shape.height {
            for x in 0..shape.width {
                if image.get(c, y, x) {
                    let k = c * plane + y * shape.width + x;
                    words[k / PIXELS_PER_WORD] |= 1 << (k % PIXELS_PER_WORD);
                }
            }
        }
    }
    words
}

/// little-endian バイト列をワード列として解釈する
pub fn decode_word_bytes(bytes: &[u8], shape: Shape3) -> Result<BitTensor> {
    if bytes.len() % 4 != 0 {
        bail!("word stream length {} is not a multiple of 4", bytes.len());
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    decode_words(&words, shape)
}

/// `0`/`1` テキストから画像を復元する
pub fn decode_text(text: &str, shape: Shape3) -> Result<BitTensor> {
    let mut bits = Vec::with_capacity(shape.len());
    for (pos, ch) in text.char_indices() {
        match ch {
            '0' => bits.push(false),
            '1' => bits.push(true),
            c if c.is_whitespace() => {}
            c => bail!("unexpected character {c:?} at byte {pos}"),
        }
    }
    if bits.len() != shape.len() {
        bail!("expected {} pixels for image {shape}, got {}", shape.len(), bits.len());
    }

    let plane = shape.height * shape.width;
    Ok(BitTensor::from_fn(shape, |c, y, x| bits[c * plane + y * shape.width + x]))
}

/// ファイルから画像を読み込む（`.gz` 対応）
pub fn load_image<P: AsRef<Path>>(path: P, format: ImageFormat, shape: Shape3) -> Result<BitTensor> {
    let path = path.as_ref();
    let bytes = read_all(path).with_context(|| format!("failed to read {}", path.display()))?;
    let image = match format {
        ImageFormat::Words => decode_word_bytes(&bytes, shape),
        ImageFormat::Text => {
            let text = std::str::from_utf8(&bytes).context("image text is not UTF-8")?;
            decode_text(text, shape)
        }
    };
    image.with_context(|| format!("invalid image {}", path.display()))
}
