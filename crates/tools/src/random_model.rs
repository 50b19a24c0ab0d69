//! 乱数モデル生成
//!
//! 学習済み重みがなくてもパイプライン全体を動かせるように、アーキテクチャに
//! 合った形状の重み・閾値を seed 付き乱数で作る。同じ seed なら同じモデル。

use anyhow::Result;
use bnn_core::{Architecture, ConvLayer, ConvWeights, DenseWeights, ModelWeights};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn random_conv<R: Rng>(rng: &mut R, m: usize, n: usize, f: usize) -> ConvLayer {
    let weights = ConvWeights::from_fn(m, n, f, |_, _, _, _| rng.random::<bool>());
    // 閾値は ±K/4（K = M*F*F）の範囲に置き、出力が全 0 / 全 1 に張り付かないようにする
    let span = ((m * f * f) / 4) as i32;
    let thresholds = (0..n).map(|_| rng.random_range(-span..=span)).collect();
    ConvLayer::new(weights, thresholds)
}

fn random_dense<R: Rng>(rng: &mut R, inputs: usize, outputs: usize) -> DenseWeights {
    DenseWeights::from_fn(inputs, outputs, |_, _| rng.random::<bool>())
}

/// `arch` に合う乱数モデルを作る
pub fn random_model(arch: &Architecture, seed: u64) -> Result<ModelWeights> {
    let shapes = arch.shapes()?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let f = arch.kernel_size;
    let [c1, c2] = [arch.conv[0].out_channels, arch.conv[1].out_channels];

    Ok(ModelWeights {
        conv1: random_conv(&mut rng, arch.input_channels, c1, f),
        conv2: random_conv(&mut rng, c1, c2, f),
        fc1: random_dense(&mut rng, shapes.flat_units, shapes.hidden_units),
        fc2: random_dense(&mut rng, shapes.hidden_units, shapes.num_classes),
    })
}
