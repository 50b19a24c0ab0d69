//! アーキテクチャ記述子
//!
//! ネットワークの形状パラメータを1か所に集約する。各段の入出力形状は
//! `Architecture::shapes()` で一括導出・検証し、呼び出し側で個別の定数を
//! 組み合わせることはしない。
//!
//! ```text
//! input  [C0][H][H]
//!   Pad₁   → [C0][H+P][H+P]
//!   Conv₁  → [C1][H+P-F+1][..]
//!   Pool₁  → [C1][(H+P-F+1)/2][..]
//!   Pad₂   → [C1][W1+P][..]
//!   Conv₂  → [C2][W1+P-F+1][..]
//!   Pool₂  → [C2][W2][W2]
//!   Flatten→ [C2*W2*W2]
//!   Dense₁ → [hidden] → Sign → Dense₂ → [classes] → Argmax
//! ```

use crate::constants::*;
use crate::error::{BnnError, BnnResult};
use crate::layers::{conv_output_shape, padded_shape, FlattenLayout, PadFill};
use crate::tensor::Shape3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 畳み込み層1つ分の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSpec {
    /// 出力チャネル数
    pub out_channels: usize,

    /// この層の入力に施すパディングの値
    #[serde(default)]
    pub pad_fill: PadFill,
}

impl ConvSpec {
    pub const fn new(out_channels: usize) -> Self {
        Self {
            out_channels,
            pad_fill: PadFill::Zero,
        }
    }
}

/// ネットワーク全体のアーキテクチャ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Architecture {
    /// 入力画像の一辺 H（= W）
    pub input_size: usize,

    /// 入力チャネル数
    pub input_channels: usize,

    /// カーネルサイズ F
    pub kernel_size: usize,

    /// パディング量（両側合計、偶数）
    pub pad: usize,

    /// 畳み込み層 ×2
    pub conv: [ConvSpec; 2],

    /// 隠れ層ユニット数
    pub hidden_units: usize,

    /// クラス数
    pub num_classes: usize,

    /// Flatten の添字写像
    pub flatten: FlattenLayout,
}

impl Default for Architecture {
    fn default() -> Self {
        Self::reference()
    }
}

impl Architecture {
    /// 参照モデル: 16×16 入力、1→16→32 チャネル、F=3、pad 2、512→256→10
    pub fn reference() -> Self {
        Self {
            input_size: INPUT_WIDTH,
            input_channels: INPUT_CHANNELS,
            kernel_size: KERNEL_SIZE,
            pad: PAD,
            conv: [ConvSpec::new(CONV1_CHANNELS), ConvSpec::new(CONV2_CHANNELS)],
            hidden_units: HIDDEN_UNITS,
            num_classes: NUM_DIGITS,
            flatten: FlattenLayout::reference(),
        }
    }

    /// 入力画像の形状
    #[inline]
    pub fn input_shape(&self) -> Shape3 {
        Shape3::square(self.input_channels, self.input_size)
    }

    /// 各段の形状を導出する
    ///
    /// 形状が成立しない構成（ゼロ次元、奇数パディング、カーネルが入力より大きい、
    /// プーリング前の一辺が奇数、要素数や fan-in が表現できないほど大きい）は
    /// ここで `InvalidArchitecture` になる。
    /// Flatten 写像の全単射性は `FlattenLayout::compile` で別途検証する。
    pub fn shapes(&self) -> BnnResult<LayerShapes> {
        let invalid = |msg: String| -> BnnResult<LayerShapes> {
            Err(BnnError::InvalidArchitecture(msg))
        };

        for (name, value) in [
            ("input_size", self.input_size),
            ("input_channels", self.input_channels),
            ("kernel_size", self.kernel_size),
            ("conv[0].out_channels", self.conv[0].out_channels),
            ("conv[1].out_channels", self.conv[1].out_channels),
            ("hidden_units", self.hidden_units),
            ("num_classes", self.num_classes),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be positive"));
            }
        }
        if self.pad % 2 != 0 {
            return invalid(format!("pad must be even, got {}", self.pad));
        }

        let input = self.input_shape();
        element_count("input", input)?;
        let window = product("kernel window", &[self.kernel_size, self.kernel_size])?;

        let mut stages = [StageShapes::default(); 2];
        let mut current = input;
        for (i, spec) in self.conv.iter().enumerate() {
            let name = ["conv1", "conv2"][i];
            if current.height.checked_add(self.pad).is_none() {
                return invalid(format!("{name}: padded input side overflows"));
            }
            let padded = padded_shape(current, self.pad);
            element_count(name, padded)?;
            if self.kernel_size > padded.height {
                return invalid(format!(
                    "{name}: kernel {} exceeds padded input {padded}",
                    self.kernel_size
                ));
            }
            let fan_in = product(name, &[current.channels, window])?;
            check_fan_in(name, fan_in)?;
            product(name, &[fan_in, spec.out_channels])?;

            let conv = conv_output_shape(padded, spec.out_channels, self.kernel_size);
            element_count(name, conv)?;
            if conv.height % 2 != 0 {
                return invalid(format!(
                    "{name}: output {conv} has odd size and cannot be 2x2 pooled"
                ));
            }

            let pool = Shape3::new(conv.channels, conv.height / 2, conv.width / 2);
            stages[i] = StageShapes {
                padded,
                conv,
                pool,
            };
            current = pool;
        }

        let flat_units = element_count("flatten", current)?;
        check_fan_in("fc1", flat_units)?;
        check_fan_in("fc2", self.hidden_units)?;
        product("fc1", &[flat_units, self.hidden_units])?;
        product("fc2", &[self.hidden_units, self.num_classes])?;

        Ok(LayerShapes {
            input,
            stages,
            flat_units,
            hidden_units: self.hidden_units,
            num_classes: self.num_classes,
        })
    }
}

/// 1ニューロンあたりの入力数の上限（`2 * K` が `i32` に収まる範囲）
pub const MAX_FAN_IN: usize = (i32::MAX / 2) as usize;

fn product(what: &str, factors: &[usize]) -> BnnResult<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| {
            BnnError::InvalidArchitecture(format!("{what}: size {factors:?} overflows usize"))
        })
}

fn element_count(what: &str, shape: Shape3) -> BnnResult<usize> {
    product(what, &[shape.channels, shape.height, shape.width])
}

fn check_fan_in(what: &str, fan_in: usize) -> BnnResult<()> {
    if fan_in > MAX_FAN_IN {
        return Err(BnnError::InvalidArchitecture(format!(
            "{what}: fan-in {fan_in} exceeds {MAX_FAN_IN}"
        )));
    }
    Ok(())
}

/// 畳み込み段1つ分の形状（Pad → Conv → Pool）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageShapes {
    pub padded: Shape3,
    pub conv: Shape3,
    pub pool: Shape3,
}

/// 導出済みの各段の形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShapes {
    pub input: Shape3,
    pub stages: [StageShapes; 2],
    pub flat_units: usize,
    pub hidden_units: usize,
    pub num_classes: usize,
}

impl LayerShapes {
    /// 最終畳み込み段（Flatten の入力）の形状
    #[inline]
    pub fn flatten_input(&self) -> Shape3 {
        self.stages[1].pool
    }
}

impl fmt::Display for LayerShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input)?;
        for s in &self.stages {
            write!(f, " -> pad {} -> conv {} -> pool {}", s.padded, s.conv, s.pool)?;
        }
        write!(
            f,
            " -> flatten [{}] -> dense [{}] -> dense [{}]",
            self.flat_units, self.hidden_units, self.num_classes
        )
    }
}
