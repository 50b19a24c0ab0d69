//! 二値全結合層
//!
//! 入力 M → 出力 N。`output[n] = 2 * count_equal(n) - M`。
//! 各出力列は入力ベクトル全体を1回だけ読む。

use super::xnor::{bipolar_sum, count_diff};
use crate::tensor::BitVec;
use crate::weights::DenseWeights;

/// 二値全結合層の順伝播
///
/// 出力は閾値処理前の固定小数点値（範囲 `[-M, M]`）。
pub fn binary_dense(input: &BitVec, weights: &DenseWeights) -> Vec<i32> {
    debug_assert_eq!(input.len(), weights.in_units());
    let m = input.len();

    (0..weights.out_units())
        .map(|n| {
            let diff = count_diff(input.words(), weights.column(n));
            bipolar_sum(m as u32 - diff, m)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::xnor::bipolar_dot;

    #[test]
    fn test_dense_small() {
        let input = BitVec::from_bits(&[true, false]);
        // 列0 = [1,0], 列1 = [0,1], 列2 = [1,1], 列3 = [0,0]
        let cols = [[true, false], [false, true], [true, true], [false, false]];
        let w = DenseWeights::from_fn(2, 4, |i, o| cols[o][i]);

        assert_eq!(binary_dense(&input, &w), vec![2, -2, 0, 0]);
    }

    #[test]
    fn test_dense_matches_bipolar_dot() {
        let bits: Vec<bool> = (0..100).map(|i| (i * 37) % 11 < 5).collect();
        let input = BitVec::from_bits(&bits);
        let w = DenseWeights::from_fn(100, 3, |i, o| (i + o * 13) % 7 < 3);

        let out = binary_dense(&input, &w);
        for (o, &v) in out.iter().enumerate() {
            let col: Vec<bool> = (0..100).map(|i| w.get(i, o)).collect();
            assert_eq!(v, bipolar_dot(&bits, &col), "unit {o}");
        }
    }
}
