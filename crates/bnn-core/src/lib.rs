//! 二値化 CNN（BNN）推論コア
//!
//! 重み・活性値・中間特徴マップが全て 1bit（bipolar: 0 = -1, 1 = +1）の
//! 畳み込みニューラルネットワークで、小さな 2値画像を数字クラスに分類する。
//! 積和演算は XNOR + popcount + 閾値で置き換え、畳み込みはラインバッファと
//! スライディングウィンドウで入力を再利用する。
//!
//! # アーキテクチャ概要（参照モデル）
//!
//! ```text
//! image [1][16][16]
//!   ↓ Pad(2) → Conv 3×3 (1→16) → MaxPool 2×2     [16][8][8]
//!   ↓ Pad(2) → Conv 3×3 (16→32) → MaxPool 2×2    [32][4][4]
//!   ↓ Flatten (bit-sliced 並べ替え)               [512]
//!   ↓ Dense 512→256 → Sign                        [256]
//!   ↓ Dense 256→10 → Argmax                       クラス番号
//! ```
//!
//! # 使い方
//!
//! ```
//! use bnn_core::{Architecture, BitTensor, BnnNetwork, ModelWeights};
//! use bnn_core::weights::{ConvLayer, DenseWeights};
//!
//! let arch = Architecture::reference();
//! let shapes = arch.shapes().unwrap();
//! let weights = ModelWeights {
//!     conv1: ConvLayer::zeros(1, 16, 3),
//!     conv2: ConvLayer::zeros(16, 32, 3),
//!     fc1: DenseWeights::zeros(shapes.flat_units, 256),
//!     fc2: DenseWeights::zeros(256, 10),
//! };
//! let net = BnnNetwork::new(arch, weights).unwrap();
//!
//! let image = BitTensor::zeros(shapes.input);
//! assert!(net.classify(&image).unwrap() < 10);
//! ```

pub mod arch;
pub mod constants;
pub mod error;
pub mod layers;
pub mod network;
pub mod tensor;
pub mod weights;

pub use arch::{Architecture, ConvSpec, LayerShapes, StageShapes};
pub use error::{BnnError, BnnResult};
pub use layers::{Axis, FlattenLayout, PadFill};
pub use network::{BnnNetwork, InferenceTrace};
pub use tensor::{BitTensor, BitVec, Shape3};
pub use weights::{ConvLayer, ConvWeights, DenseWeights, ModelWeights};
