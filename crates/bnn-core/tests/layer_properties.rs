//! 各層の性質テスト（popcount 等価性、畳み込みの形状則とウィンドウ等価性、
//! プーリング、Flatten の全単射性、Argmax、Padding）

use bnn_core::layers::{
    argmax, binary_conv2d, binary_conv2d_reference, bipolar_dot, bipolar_sum, count_equal,
    max_pool_2x2, pad, Axis, FlattenLayout, PadFill,
};
use bnn_core::{BitTensor, BitVec, ConvWeights, Shape3};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn random_tensor(rng: &mut impl Rng, shape: Shape3) -> BitTensor {
    BitTensor::from_fn(shape, |_, _, _| rng.random::<bool>())
}

fn random_conv_weights(rng: &mut impl Rng, m: usize, n: usize, f: usize) -> ConvWeights {
    ConvWeights::from_fn(m, n, f, |_, _, _, _| rng.random::<bool>())
}

fn arb_axis_order() -> impl Strategy<Value = [Axis; 3]> {
    prop::sample::select(vec![
        [Axis::Channel, Axis::Row, Axis::Col],
        [Axis::Channel, Axis::Col, Axis::Row],
        [Axis::Row, Axis::Channel, Axis::Col],
        [Axis::Row, Axis::Col, Axis::Channel],
        [Axis::Col, Axis::Channel, Axis::Row],
        [Axis::Col, Axis::Row, Axis::Channel],
    ])
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]

    /// 2 * count_equal - K は bipolar 内積に等しい
    #[test]
    fn prop_popcount_matches_bipolar_dot(
        k in prop::sample::select(vec![1usize, 9, 63, 64, 65, 72, 144, 512]),
        seed in any::<u64>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let a: Vec<bool> = (0..k).map(|_| rng.random()).collect();
        let b: Vec<bool> = (0..k).map(|_| rng.random()).collect();

        let va = BitVec::from_bits(&a);
        let vb = BitVec::from_bits(&b);
        let eq = count_equal(va.words(), vb.words(), k);
        prop_assert_eq!(bipolar_sum(eq, k), bipolar_dot(&a, &b));
    }

    /// ラインバッファ版と素朴な全再計算版がビット一致する
    #[test]
    fn prop_sliding_window_matches_reference(
        m in 1usize..=70,
        n in 1usize..=9,
        f in 1usize..=4,
        extra in 0usize..=5,
        seed in any::<u64>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let size = f + extra;
        let input = random_tensor(&mut rng, Shape3::square(m, size));
        let weights = random_conv_weights(&mut rng, m, n, f);
        let k = (m * f * f) as i32;
        let thresholds: Vec<i32> = (0..n).map(|_| rng.random_range(-k..=k)).collect();

        let fast = binary_conv2d(&input, &weights, &thresholds);
        let slow = binary_conv2d_reference(&input, &weights, &thresholds);
        prop_assert_eq!(fast.shape(), Shape3::square(n, size - f + 1));
        prop_assert_eq!(fast, slow);
    }

    /// 長方形の入力でも縁まで正しく走査する
    #[test]
    fn prop_rectangular_input_matches_reference(
        h in 3usize..=8,
        w in 3usize..=8,
        seed in any::<u64>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let input = random_tensor(&mut rng, Shape3::new(5, h, w));
        let weights = random_conv_weights(&mut rng, 5, 4, 3);
        let thresholds = [-9, -1, 0, 3];

        let fast = binary_conv2d(&input, &weights, &thresholds);
        prop_assert_eq!(fast.shape(), Shape3::new(4, h - 2, w - 2));
        prop_assert_eq!(fast, binary_conv2d_reference(&input, &weights, &thresholds));
    }

    /// どの軸順でも Flatten 写像は全単射
    #[test]
    fn prop_flatten_is_bijective(
        c in 1usize..=40,
        h in 1usize..=6,
        w in 1usize..=6,
        order in arb_axis_order(),
    ) {
        let shape = Shape3::new(c, h, w);
        let map = FlattenLayout::Sliced { order }.compile(shape).unwrap();
        prop_assert_eq!(map.len(), shape.len());

        let mut seen = vec![false; shape.len()];
        for i in 0..map.len() {
            let (cc, y, x) = map.source(i);
            let linear = (cc * h + y) * w + x;
            prop_assert!(!seen[linear]);
            seen[linear] = true;
        }
        prop_assert!(seen.iter().all(|&s| s));
    }

    /// OR プーリング: 出力が 1 ⇔ ブロック内に 1 がある
    #[test]
    fn prop_pool_is_block_or(
        c in 1usize..=70,
        half in 1usize..=4,
        seed in any::<u64>(),
    ) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let input = random_tensor(&mut rng, Shape3::square(c, half * 2));
        let out = max_pool_2x2(&input);
        prop_assert_eq!(out.shape(), Shape3::square(c, half));
        for ch in 0..c {
            for y in 0..half {
                for x in 0..half {
                    let any = input.get(ch, 2 * y, 2 * x)
                        || input.get(ch, 2 * y, 2 * x + 1)
                        || input.get(ch, 2 * y + 1, 2 * x)
                        || input.get(ch, 2 * y + 1, 2 * x + 1);
                    prop_assert_eq!(out.get(ch, y, x), any);
                }
            }
        }
    }
}

#[test]
fn test_conv_shape_law() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xB17);
    for (m, n, i, f) in [(1, 16, 18, 3), (16, 32, 10, 3), (3, 2, 5, 5), (2, 7, 6, 1)] {
        let input = random_tensor(&mut rng, Shape3::square(m, i));
        let weights = random_conv_weights(&mut rng, m, n, f);
        let out = binary_conv2d(&input, &weights, &vec![0; n]);
        assert_eq!(out.shape(), Shape3::square(n, i - f + 1));
    }
}

#[test]
fn test_padding_ring() {
    let input = BitTensor::filled(Shape3::square(1, 4), true);
    let out = pad(&input, 2, PadFill::Zero);
    assert_eq!(out.shape(), Shape3::square(1, 6));

    for i in 0..6 {
        assert!(!out.get(0, 0, i));
        assert!(!out.get(0, 5, i));
        assert!(!out.get(0, i, 0));
        assert!(!out.get(0, i, 5));
    }
    for y in 1..5 {
        for x in 1..5 {
            assert!(out.get(0, y, x));
        }
    }
}

#[test]
fn test_argmax_tie_break() {
    assert_eq!(argmax(&[5, 5, 3]), 0);
    assert_eq!(argmax(&[1, 7, 7, 2]), 1);
}

#[test]
fn test_pool_all_2x2_patterns() {
    for pattern in 0u32..16 {
        let input = BitTensor::from_fn(Shape3::square(1, 2), |_, y, x| {
            (pattern >> (y * 2 + x)) & 1 == 1
        });
        assert_eq!(max_pool_2x2(&input).get(0, 0, 0), pattern != 0);
    }
}
