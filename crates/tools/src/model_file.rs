//! BNNW ファイル I/O
//!
//! 学習済み BNN パラメータの独自バイナリ形式。全て little-endian。
//!
//! ```text
//! header (48 bytes)
//!   magic "BNNW" | version u32 | input_size | input_channels | kernel_size | pad
//!   | conv1_out | conv1_pad_fill | conv2_out | conv2_pad_fill | hidden | classes
//! conv1: thresholds i32 × N1, weight bits [m][n][r][c]
//! conv2: thresholds i32 × N2, weight bits [m][n][r][c]
//! fc1:   weight bits [in][out]
//! fc2:   weight bits [in][out]
//! ```
//!
//! ビット列は LSB-first でバイトに詰め、セクションごとにバイト境界まで 0 で埋める。
//! Flatten の並びはファイルに含まれず、アーキテクチャ側（TOML）で与える。

use crate::io::{open_reader, open_writer};
use anyhow::{Context, Result};
use bnn_core::{
    Architecture, BnnNetwork, ConvLayer, ConvSpec, ConvWeights, DenseWeights, ModelWeights,
    PadFill,
};
use log::info;
use std::io::{self, Read, Write};
use std::path::Path;

/// BNNW ファイルマジックナンバー
pub const BNNW_MAGIC: [u8; 4] = *b"BNNW";

/// BNNW ファイルバージョン
pub const BNNW_VERSION: u32 = 1;

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// BNNW ヘッダ（48 bytes）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    pub input_size: u32,
    pub input_channels: u32,
    pub kernel_size: u32,
    pub pad: u32,
    /// 畳み込み層ごとの出力チャネル数
    pub conv_channels: [u32; 2],
    /// 畳み込み層ごとのパディング値（0 = Zero, 1 = One）
    pub pad_fill: [u32; 2],
    pub hidden_units: u32,
    pub num_classes: u32,
}

impl ModelHeader {
    /// ヘッダーサイズ（bytes）
    pub const SIZE: usize = 48;

    /// アーキテクチャからヘッダを作る
    pub fn from_architecture(arch: &Architecture) -> io::Result<Self> {
        let field = |name: &str, v: usize| {
            u32::try_from(v).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("{name} too large: {v}"))
            })
        };
        let fill = |f: PadFill| u32::from(f.bit());
        Ok(Self {
            input_size: field("input_size", arch.input_size)?,
            input_channels: field("input_channels", arch.input_channels)?,
            kernel_size: field("kernel_size", arch.kernel_size)?,
            pad: field("pad", arch.pad)?,
            conv_channels: [
                field("conv1 out_channels", arch.conv[0].out_channels)?,
                field("conv2 out_channels", arch.conv[1].out_channels)?,
            ],
            pad_fill: [fill(arch.conv[0].pad_fill), fill(arch.conv[1].pad_fill)],
            hidden_units: field("hidden_units", arch.hidden_units)?,
            num_classes: field("num_classes", arch.num_classes)?,
        })
    }

    /// バイト列から読み込み
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> io::Result<Self> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != BNNW_MAGIC {
            return Err(invalid_data(format!("Invalid BNNW magic: {magic:?}")));
        }

        let word = |i: usize| {
            let o = 4 + i * 4;
            u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
        };

        let version = word(0);
        if version != BNNW_VERSION {
            return Err(invalid_data(format!("Unsupported BNNW version: {version}")));
        }

        let header = Self {
            input_size: word(1),
            input_channels: word(2),
            kernel_size: word(3),
            pad: word(4),
            conv_channels: [word(5), word(7)],
            pad_fill: [word(6), word(8)],
            hidden_units: word(9),
            num_classes: word(10),
        };

        for (i, &fill) in header.pad_fill.iter().enumerate() {
            if fill > 1 {
                return Err(invalid_data(format!("Invalid conv{} pad_fill: {fill}", i + 1)));
            }
        }
        Ok(header)
    }

    /// バイト列に書き出し
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&BNNW_MAGIC);
        let words = [
            BNNW_VERSION,
            self.input_size,
            self.input_channels,
            self.kernel_size,
            self.pad,
            self.conv_channels[0],
            self.pad_fill[0],
            self.conv_channels[1],
            self.pad_fill[1],
            self.hidden_units,
            self.num_classes,
        ];
        for (i, w) in words.iter().enumerate() {
            let o = 4 + i * 4;
            bytes[o..o + 4].copy_from_slice(&w.to_le_bytes());
        }
        bytes
    }

    /// `base` の Flatten 設定を保ったまま、次元をヘッダの値で置き換える
    pub fn apply_to(&self, base: &Architecture) -> Architecture {
        let spec = |i: usize| ConvSpec {
            out_channels: self.conv_channels[i] as usize,
            pad_fill: if self.pad_fill[i] == 1 {
                PadFill::One
            } else {
                PadFill::Zero
            },
        };
        Architecture {
            input_size: self.input_size as usize,
            input_channels: self.input_channels as usize,
            kernel_size: self.kernel_size as usize,
            pad: self.pad as usize,
            conv: [spec(0), spec(1)],
            hidden_units: self.hidden_units as usize,
            num_classes: self.num_classes as usize,
            flatten: base.flatten.clone(),
        }
    }
}

// =============================================================================
// ビット列
// =============================================================================

/// LSB-first でバイトに詰める（末尾はバイト境界まで 0）
fn pack_bits(bits: impl Iterator<Item = bool>) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (i, bit) in bits.enumerate() {
        if i % 8 == 0 {
            bytes.push(0);
        }
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// ちょうど `len` バイト読む
///
/// バッファは実際に読めた分だけ伸ばすので、ヘッダの次元が巨大でも
/// データが足りなければ確保前に `UnexpectedEof` で止まる。
fn read_section<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

fn read_bits<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<u8>> {
    read_section(reader, count.div_ceil(8))
}

#[inline]
fn bit_at(bytes: &[u8], i: usize) -> bool {
    (bytes[i / 8] >> (i % 8)) & 1 == 1
}

// =============================================================================
// 読み込み / 書き出し
// =============================================================================

fn read_conv<R: Read>(reader: &mut R, m: usize, n: usize, f: usize) -> io::Result<ConvLayer> {
    let thresholds = read_section(reader, n.saturating_mul(4))?
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let count = m * n * f * f;
    let bytes = read_bits(reader, count)?;
    let weights = ConvWeights::from_fn(m, n, f, |mm, nn, r, c| {
        bit_at(&bytes, ((mm * n + nn) * f + r) * f + c)
    });
    Ok(ConvLayer::new(weights, thresholds))
}

fn read_dense<R: Read>(reader: &mut R, inputs: usize, outputs: usize) -> io::Result<DenseWeights> {
    let bytes = read_bits(reader, inputs * outputs)?;
    Ok(DenseWeights::from_fn(inputs, outputs, |i, o| {
        bit_at(&bytes, i * outputs + o)
    }))
}

fn write_conv<W: Write>(writer: &mut W, layer: &ConvLayer) -> io::Result<()> {
    for t in &layer.thresholds {
        writer.write_all(&t.to_le_bytes())?;
    }
    let w = &layer.weights;
    let (m, n, f) = (w.in_channels(), w.out_channels(), w.kernel_size());
    let bits = (0..m).flat_map(move |mm| {
        (0..n).flat_map(move |nn| {
            (0..f).flat_map(move |r| (0..f).map(move |c| w.get(mm, nn, r, c)))
        })
    });
    writer.write_all(&pack_bits(bits))
}

fn write_dense<W: Write>(writer: &mut W, w: &DenseWeights) -> io::Result<()> {
    let (inputs, outputs) = (w.in_units(), w.out_units());
    let bits = (0..inputs).flat_map(move |i| (0..outputs).map(move |o| w.get(i, o)));
    writer.write_all(&pack_bits(bits))
}

/// BNNW ファイルを読み込む
///
/// 返すアーキテクチャの次元はヘッダの値、Flatten の並びは `base` のもの。
/// ヘッダ次元が形状として成立しない場合・データが途中で切れている場合・
/// 末尾に余分なデータがある場合は `InvalidData`。
pub fn read_model<R: Read>(
    reader: &mut R,
    base: &Architecture,
) -> io::Result<(Architecture, ModelWeights)> {
    let mut header_bytes = [0u8; ModelHeader::SIZE];
    reader.read_exact(&mut header_bytes)?;
    let header = ModelHeader::from_bytes(&header_bytes)?;

    let arch = header.apply_to(base);
    let shapes = arch
        .shapes()
        .map_err(|e| invalid_data(format!("Invalid BNNW header: {e}")))?;
    let f = arch.kernel_size;
    let [c1, c2] = [arch.conv[0].out_channels, arch.conv[1].out_channels];

    let read_err = |section: &'static str| {
        move |e: io::Error| match e.kind() {
            io::ErrorKind::UnexpectedEof => invalid_data(format!("BNNW truncated in {section}")),
            _ => e,
        }
    };

    let conv1 = read_conv(reader, arch.input_channels, c1, f).map_err(read_err("conv1"))?;
    let conv2 = read_conv(reader, c1, c2, f).map_err(read_err("conv2"))?;
    let fc1 = read_dense(reader, shapes.flat_units, shapes.hidden_units)
        .map_err(read_err("fc1"))?;
    let fc2 = read_dense(reader, shapes.hidden_units, shapes.num_classes)
        .map_err(read_err("fc2"))?;

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(invalid_data("Trailing data after BNNW payload"));
    }

    Ok((
        arch,
        ModelWeights {
            conv1,
            conv2,
            fc1,
            fc2,
        },
    ))
}

/// BNNW ファイルを書き出す
///
/// 重みの形状は呼び出し側で `BnnNetwork::new` 等により検証済みであること。
pub fn write_model<W: Write>(
    writer: &mut W,
    arch: &Architecture,
    weights: &ModelWeights,
) -> io::Result<()> {
    writer.write_all(&ModelHeader::from_architecture(arch)?.to_bytes())?;
    write_conv(writer, &weights.conv1)?;
    write_conv(writer, &weights.conv2)?;
    write_dense(writer, &weights.fc1)?;
    write_dense(writer, &weights.fc2)
}

/// モデルファイルを読み込んでネットワークを構築する（`.gz` 対応）
pub fn load_network<P: AsRef<Path>>(path: P, base: &Architecture) -> Result<BnnNetwork> {
    let path = path.as_ref();
    let mut reader =
        open_reader(path).with_context(|| format!("failed to open {}", path.display()))?;
    let (arch, weights) = read_model(&mut reader, base)
        .with_context(|| format!("failed to read model {}", path.display()))?;
    let net = BnnNetwork::new(arch, weights)
        .with_context(|| format!("model {} does not fit its architecture", path.display()))?;
    info!("loaded model {}: {}", path.display(), net.shapes());
    Ok(net)
}

/// モデルファイルを書き出す（`.gz` 対応）
pub fn save_model<P: AsRef<Path>>(
    path: P,
    arch: &Architecture,
    weights: &ModelWeights,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer =
        open_writer(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_model(&mut writer, arch, weights)
        .with_context(|| format!("failed to write model {}", path.display()))?;
    writer.close()?;
    Ok(())
}
