//! BNN 推論パイプライン
//!
//! ```text
//! Pad₁ → Conv₁ → Pool₁ → Pad₂ → Conv₂ → Pool₂ → Flatten → Dense₁ → Sign → Dense₂ → Argmax
//! ```
//!
//! 分岐のない固定合成。各段は前段の出力を借用し、自分の出力を新しく確保する。
//! `BnnNetwork` は構築後は読み取り専用なので、複数スレッドから同時に
//! `classify` してよい（中間テンソルは呼び出しごとに別物）。

use crate::arch::{Architecture, LayerShapes};
use crate::error::{BnnError, BnnResult};
use crate::layers::{
    argmax, binary_conv2d, binary_dense, flatten, max_pool_2x2, pad, sign, FlattenMap,
};
use crate::tensor::{BitTensor, BitVec, Shape3};
use crate::weights::{ConvLayer, DenseWeights, ModelWeights};
use log::{debug, trace};

/// 1回の推論の全中間結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceTrace {
    pub padded1: BitTensor,
    pub conv1: BitTensor,
    pub pool1: BitTensor,
    pub padded2: BitTensor,
    pub conv2: BitTensor,
    pub pool2: BitTensor,
    pub flattened: BitVec,
    pub dense1: Vec<i32>,
    pub signed1: BitVec,
    /// Dense₂ の出力（Argmax 前のクラススコア）
    pub scores: Vec<i32>,
    pub class: usize,
}

/// 構築済みの BNN
#[derive(Debug, Clone)]
pub struct BnnNetwork {
    arch: Architecture,
    shapes: LayerShapes,
    weights: ModelWeights,
    flatten: FlattenMap,
}

impl BnnNetwork {
    /// アーキテクチャと重みからネットワークを構築する
    ///
    /// 全ての形状（重み・閾値・Flatten 写像）をここで検証する。
    /// 構築に成功したネットワークの推論は、入力画像の形状以外では失敗しない。
    pub fn new(arch: Architecture, weights: ModelWeights) -> BnnResult<Self> {
        let shapes = arch.shapes()?;

        check_conv(
            "conv1",
            &weights.conv1,
            shapes.input.channels,
            arch.conv[0].out_channels,
            arch.kernel_size,
        )?;
        check_conv(
            "conv2",
            &weights.conv2,
            shapes.stages[0].pool.channels,
            arch.conv[1].out_channels,
            arch.kernel_size,
        )?;
        check_dense("fc1", &weights.fc1, shapes.flat_units, shapes.hidden_units)?;
        check_dense("fc2", &weights.fc2, shapes.hidden_units, shapes.num_classes)?;

        let flatten = arch.flatten.compile(shapes.flatten_input())?;

        debug!("BNN network constructed: {shapes}");
        debug!("flatten layout: {:?}", arch.flatten);

        Ok(Self {
            arch,
            shapes,
            weights,
            flatten,
        })
    }

    #[inline]
    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    #[inline]
    pub fn shapes(&self) -> &LayerShapes {
        &self.shapes
    }

    #[inline]
    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    #[inline]
    pub fn flatten_map(&self) -> &FlattenMap {
        &self.flatten
    }

    /// 画像を分類してクラス番号を返す
    pub fn classify(&self, image: &BitTensor) -> BnnResult<usize> {
        Ok(self.forward_trace(image)?.class)
    }

    /// Argmax 前のクラススコア
    pub fn scores(&self, image: &BitTensor) -> BnnResult<Vec<i32>> {
        Ok(self.forward_trace(image)?.scores)
    }

    /// 全段を実行し、中間結果をすべて返す
    pub fn forward_trace(&self, image: &BitTensor) -> BnnResult<InferenceTrace> {
        let expected = self.shapes.input;
        if image.shape() != expected {
            return Err(BnnError::ImageShape {
                expected,
                actual: image.shape(),
            });
        }

        let w = &self.weights;
        let pad_amount = self.arch.pad;

        // 第1畳み込み段
        let padded1 = pad(image, pad_amount, self.arch.conv[0].pad_fill);
        let conv1 = binary_conv2d(&padded1, &w.conv1.weights, &w.conv1.thresholds);
        let pool1 = max_pool_2x2(&conv1);
        trace!("stage1: conv1 ones={} pool1 ones={}", conv1.count_ones(), pool1.count_ones());

        // 第2畳み込み段
        let padded2 = pad(&pool1, pad_amount, self.arch.conv[1].pad_fill);
        let conv2 = binary_conv2d(&padded2, &w.conv2.weights, &w.conv2.thresholds);
        let pool2 = max_pool_2x2(&conv2);
        trace!("stage2: conv2 ones={} pool2 ones={}", conv2.count_ones(), pool2.count_ones());

        // 全結合段
        let flattened = flatten(&pool2, &self.flatten);
        let dense1 = binary_dense(&flattened, &w.fc1);
        let signed1 = sign(&dense1);
        let scores = binary_dense(&signed1, &w.fc2);
        let class = argmax(&scores);
        trace!("scores={scores:?} class={class}");

        Ok(InferenceTrace {
            padded1,
            conv1,
            pool1,
            padded2,
            conv2,
            pool2,
            flattened,
            dense1,
            signed1,
            scores,
            class,
        })
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> BnnResult<()> {
    if expected != actual {
        return Err(BnnError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_conv(
    name: &'static str,
    layer: &ConvLayer,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
) -> BnnResult<()> {
    let w = &layer.weights;
    let expected = Shape3::square(in_channels, kernel_size);
    let actual = Shape3::square(w.in_channels(), w.kernel_size());
    if expected != actual {
        return Err(BnnError::ShapeMismatch {
            what: name,
            expected,
            actual,
        });
    }
    check_len(name, out_channels, w.out_channels())?;
    check_len(name, out_channels, layer.thresholds.len())
}

fn check_dense(
    name: &'static str,
    w: &DenseWeights,
    in_units: usize,
    out_units: usize,
) -> BnnResult<()> {
    check_len(name, in_units, w.in_units())?;
    check_len(name, out_units, w.out_units())
}
