//! ネットワーク全体の推論テスト
//!
//! 参照アーキテクチャにランダム重みを与え、素朴な bool 演算だけで組んだ
//! オラクルと全段のスコアが一致することを確認する。

use bnn_core::constants::{
    FLATTEN_CHANNEL_MASK, FLATTEN_COL_MASK, FLATTEN_COL_SHIFT, FLATTEN_ROW_MASK,
    FLATTEN_ROW_SHIFT, FLAT_UNITS,
};
use bnn_core::{
    Architecture, BitTensor, BnnNetwork, ConvLayer, ConvWeights, DenseWeights, FlattenLayout,
    ModelWeights, PadFill, Shape3,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

type Grid = Vec<Vec<Vec<bool>>>;

fn random_layer(rng: &mut impl Rng, m: usize, n: usize, f: usize) -> ConvLayer {
    let weights = ConvWeights::from_fn(m, n, f, |_, _, _, _| rng.random::<bool>());
    let k = (m * f * f) as i32;
    let thresholds = (0..n).map(|_| rng.random_range(-k / 3..=k / 3)).collect();
    ConvLayer::new(weights, thresholds)
}

fn random_weights(seed: u64) -> ModelWeights {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    ModelWeights {
        conv1: random_layer(&mut rng, 1, 16, 3),
        conv2: random_layer(&mut rng, 16, 32, 3),
        fc1: DenseWeights::from_fn(FLAT_UNITS, 256, |_, _| rng.random::<bool>()),
        fc2: DenseWeights::from_fn(256, 10, |_, _| rng.random::<bool>()),
    }
}

fn random_image(rng: &mut impl Rng) -> BitTensor {
    BitTensor::from_fn(Shape3::square(1, 16), |_, _, _| rng.random_bool(0.3))
}

// -----------------------------------------------------------------------------
// bool 配列で書いたオラクル
// -----------------------------------------------------------------------------

fn to_grid(t: &BitTensor) -> Grid {
    let s = t.shape();
    (0..s.channels)
        .map(|c| {
            (0..s.height)
                .map(|y| (0..s.width).map(|x| t.get(c, y, x)).collect())
                .collect()
        })
        .collect()
}

fn oracle_pad(input: &Grid, pad: usize, fill: bool) -> Grid {
    let half = pad / 2;
    let size = input[0].len() + pad;
    input
        .iter()
        .map(|plane| {
            (0..size)
                .map(|y| {
                    (0..size)
                        .map(|x| {
                            if y < half || x < half || y >= size - half || x >= size - half {
                                fill
                            } else {
                                plane[y - half][x - half]
                            }
                        })
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn oracle_conv(input: &Grid, layer: &ConvLayer) -> Grid {
    let w = &layer.weights;
    let f = w.kernel_size();
    let out = input[0].len() - f + 1;
    (0..w.out_channels())
        .map(|n| {
            (0..out)
                .map(|y| {
                    (0..out)
                        .map(|x| {
                            let mut acc = 0i32;
                            for (m, plane) in input.iter().enumerate() {
                                for r in 0..f {
                                    for c in 0..f {
                                        let a = if plane[y + r][x + c] { 1 } else { -1 };
                                        let b = if w.get(m, n, r, c) { 1 } else { -1 };
                                        acc += a * b;
                                    }
                                }
                            }
                            acc > layer.thresholds[n]
                        })
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn oracle_pool(input: &Grid) -> Grid {
    let out = input[0].len() / 2;
    input
        .iter()
        .map(|plane| {
            (0..out)
                .map(|y| {
                    (0..out)
                        .map(|x| {
                            plane[2 * y][2 * x]
                                || plane[2 * y][2 * x + 1]
                                || plane[2 * y + 1][2 * x]
                                || plane[2 * y + 1][2 * x + 1]
                        })
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn oracle_flatten(input: &Grid) -> Vec<bool> {
    (0..FLAT_UNITS)
        .map(|i| {
            let c = i & FLATTEN_CHANNEL_MASK;
            let col = (i & FLATTEN_COL_MASK) >> FLATTEN_COL_SHIFT;
            let row = (i & FLATTEN_ROW_MASK) >> FLATTEN_ROW_SHIFT;
            input[c][row][col]
        })
        .collect()
}

fn oracle_dense(input: &[bool], w: &DenseWeights) -> Vec<i32> {
    (0..w.out_units())
        .map(|o| {
            input
                .iter()
                .enumerate()
                .map(|(i, &a)| if a == w.get(i, o) { 1 } else { -1 })
                .sum()
        })
        .collect()
}

fn oracle_scores(arch: &Architecture, weights: &ModelWeights, image: &BitTensor) -> Vec<i32> {
    let x = oracle_pad(&to_grid(image), arch.pad, arch.conv[0].pad_fill.bit());
    let x = oracle_pool(&oracle_conv(&x, &weights.conv1));
    let x = oracle_pad(&x, arch.pad, arch.conv[1].pad_fill.bit());
    let x = oracle_pool(&oracle_conv(&x, &weights.conv2));
    let flat = oracle_flatten(&x);
    let hidden: Vec<bool> = oracle_dense(&flat, &weights.fc1)
        .into_iter()
        .map(|v| v > 0)
        .collect();
    oracle_dense(&hidden, &weights.fc2)
}

fn first_argmax(scores: &[i32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

// -----------------------------------------------------------------------------

#[test]
fn test_reference_network_matches_oracle() {
    let arch = Architecture::reference();
    let weights = random_weights(0x5EED_0001);
    let net = BnnNetwork::new(arch.clone(), weights.clone()).unwrap();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    for _ in 0..8 {
        let image = random_image(&mut rng);
        let expected = oracle_scores(&arch, &weights, &image);
        let trace = net.forward_trace(&image).unwrap();
        assert_eq!(trace.scores, expected);
        assert_eq!(trace.class, first_argmax(&expected));
        assert_eq!(trace.pool2.shape(), Shape3::square(32, 4));
        assert_eq!(trace.flattened.len(), FLAT_UNITS);
    }
}

#[test]
fn test_pad_fill_one_matches_oracle() {
    let mut arch = Architecture::reference();
    arch.conv[0].pad_fill = PadFill::One;
    let weights = random_weights(0x5EED_0002);
    let net = BnnNetwork::new(arch.clone(), weights.clone()).unwrap();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    for _ in 0..4 {
        let image = random_image(&mut rng);
        assert_eq!(
            net.scores(&image).unwrap(),
            oracle_scores(&arch, &weights, &image)
        );
    }
}

#[test]
fn test_classification_is_deterministic() {
    let net = BnnNetwork::new(Architecture::reference(), random_weights(99)).unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
    let image = random_image(&mut rng);

    let first = net.forward_trace(&image).unwrap();
    for _ in 0..5 {
        assert_eq!(net.forward_trace(&image).unwrap(), first);
    }
}

#[test]
fn test_network_is_shareable_across_threads() {
    let net = BnnNetwork::new(Architecture::reference(), random_weights(5)).unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(77);
    let images: Vec<BitTensor> = (0..4).map(|_| random_image(&mut rng)).collect();
    let serial: Vec<usize> = images.iter().map(|i| net.classify(i).unwrap()).collect();

    let parallel: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = images
            .iter()
            .map(|img| s.spawn(|| net.classify(img).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(serial, parallel);
}

#[test]
fn test_row_major_layout_changes_only_order() {
    let weights = random_weights(11);
    let reference = BnnNetwork::new(Architecture::reference(), weights.clone()).unwrap();
    let arch = Architecture {
        flatten: FlattenLayout::row_major(),
        ..Architecture::reference()
    };
    let row_major = BnnNetwork::new(arch, weights).unwrap();

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let image = random_image(&mut rng);
    let a = reference.forward_trace(&image).unwrap();
    let b = row_major.forward_trace(&image).unwrap();
    assert_eq!(a.pool2, b.pool2);
    assert_eq!(a.flattened.count_ones(), b.flattened.count_ones());
}
