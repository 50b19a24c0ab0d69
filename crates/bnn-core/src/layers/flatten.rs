//! Flatten（最終畳み込み出力 → 1次元ベクトル）
//!
//! 素直な row-major ではなく、flat index の桁（2冪なら bit field）を
//! チャネル・行・列に割り当てる固定の並べ替えを行う。第1全結合層の重みは
//! この並びで詰められているため、写像を変えると学習済み重みと整合しなくなる。
//!
//! 参照モデル（`[32][4][4]` → 512）は `order = [Channel, Col, Row]`:
//!
//! ```text
//! index bit: 8 7 | 6 5 | 4 3 2 1 0
//!            row | col | channel
//! ```

use crate::error::{BnnError, BnnResult};
use crate::tensor::{BitTensor, BitVec, Shape3};
use serde::{Deserialize, Serialize};

/// テンソルの軸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Channel,
    Row,
    Col,
}

impl Axis {
    #[inline]
    fn extent(self, shape: Shape3) -> usize {
        match self {
            Axis::Channel => shape.channels,
            Axis::Row => shape.height,
            Axis::Col => shape.width,
        }
    }
}

/// flat index → `(channel, row, col)` の写像
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlattenLayout {
    /// 下位桁から順に `order` の軸へ割り当てる混合基数
    Sliced { order: [Axis; 3] },
    /// 明示テーブル（`entries[index] = [channel, row, col]`）
    Table { entries: Vec<[usize; 3]> },
}

impl Default for FlattenLayout {
    fn default() -> Self {
        Self::reference()
    }
}

impl FlattenLayout {
    /// 参照モデルの並び（チャネルが最下位、次に列、最上位が行）
    pub const fn reference() -> Self {
        FlattenLayout::Sliced {
            order: [Axis::Channel, Axis::Col, Axis::Row],
        }
    }

    /// 素直な row-major（`index = (c * H + y) * W + x`）
    pub const fn row_major() -> Self {
        FlattenLayout::Sliced {
            order: [Axis::Col, Axis::Row, Axis::Channel],
        }
    }

    /// flat index の取り出し元 `(channel, row, col)`
    ///
    /// テーブル範囲外は `None`。
    pub fn source(&self, shape: Shape3, index: usize) -> Option<(usize, usize, usize)> {
        match self {
            FlattenLayout::Sliced { order } => {
                if index >= shape.len() {
                    return None;
                }
                let mut digits = [0usize; 3];
                let mut rest = index;
                for axis in order {
                    let extent = axis.extent(shape);
                    let slot = match axis {
                        Axis::Channel => 0,
                        Axis::Row => 1,
                        Axis::Col => 2,
                    };
                    digits[slot] = rest % extent;
                    rest /= extent;
                }
                Some((digits[0], digits[1], digits[2]))
            }
            FlattenLayout::Table { entries } => entries.get(index).map(|e| (e[0], e[1], e[2])),
        }
    }

    /// 写像を検証してルックアップ表にする
    ///
    /// 全 flat index がテンソル内の相異なる要素を指し、全要素がちょうど1回ずつ
    /// 現れること（全単射）を確認する。
    pub fn compile(&self, shape: Shape3) -> BnnResult<FlattenMap> {
        if let FlattenLayout::Sliced { order } = self {
            for axis in [Axis::Channel, Axis::Row, Axis::Col] {
                if order.iter().filter(|&&a| a == axis).count() != 1 {
                    return Err(BnnError::FlattenNotBijective(format!(
                        "axis order {order:?} must name each axis exactly once"
                    )));
                }
            }
        }
        if let FlattenLayout::Table { entries } = self {
            if entries.len() != shape.len() {
                return Err(BnnError::FlattenNotBijective(format!(
                    "table has {} entries, tensor {shape} has {} elements",
                    entries.len(),
                    shape.len()
                )));
            }
        }

        let mut seen = vec![false; shape.len()];
        let mut sources = Vec::with_capacity(shape.len());
        for index in 0..shape.len() {
            let (c, y, x) = self
                .source(shape, index)
                .ok_or_else(|| BnnError::FlattenNotBijective(format!("index {index} unmapped")))?;
            if c >= shape.channels || y >= shape.height || x >= shape.width {
                return Err(BnnError::FlattenNotBijective(format!(
                    "index {index} maps outside {shape}: ({c}, {y}, {x})"
                )));
            }
            let linear = (c * shape.height + y) * shape.width + x;
            if std::mem::replace(&mut seen[linear], true) {
                return Err(BnnError::FlattenNotBijective(format!(
                    "index {index} revisits ({c}, {y}, {x})"
                )));
            }
            sources.push(Source {
                channel: c as u32,
                row: y as u32,
                col: x as u32,
            });
        }

        Ok(FlattenMap { shape, sources })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Source {
    channel: u32,
    row: u32,
    col: u32,
}

/// 検証済みの Flatten 写像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenMap {
    shape: Shape3,
    sources: Vec<Source>,
}

impl FlattenMap {
    /// 入力テンソルの形状
    #[inline]
    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    /// 出力ベクトル長
    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// flat index の取り出し元 `(channel, row, col)`
    #[inline]
    pub fn source(&self, index: usize) -> (usize, usize, usize) {
        let s = self.sources[index];
        (s.channel as usize, s.row as usize, s.col as usize)
    }
}

/// 写像に従ってテンソルを1次元に並べ替える
pub fn flatten(input: &BitTensor, map: &FlattenMap) -> BitVec {
    debug_assert_eq!(input.shape(), map.shape());
    map.sources
        .iter()
        .map(|s| input.get(s.channel as usize, s.row as usize, s.col as usize))
        .collect()
}
