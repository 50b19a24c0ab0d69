//! XNOR-popcount
//!
//! bipolar 値 {-1, +1} 同士の積は「ビットが一致すれば +1、不一致なら -1」。
//! よって K 項の内積は `2 * count_equal - K` = `K - 2 * count_diff` になる。

/// 一致ビット数を数える（`a`, `b` とも `bits` 以降の未使用ビットは 0 であること）
#[inline]
pub fn count_equal(a: &[u64], b: &[u64], bits: usize) -> u32 {
    bits as u32 - count_diff(a, b)
}

/// 不一致ビット数（XOR の popcount）
#[inline]
pub fn count_diff(a: &[u64], b: &[u64]) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// 一致数から bipolar 内積を得る
#[inline]
pub const fn bipolar_sum(count_equal: u32, k: usize) -> i32 {
    2 * count_equal as i32 - k as i32
}

/// bipolar 内積を素直に計算する（検証用）
pub fn bipolar_dot(a: &[bool], b: &[bool]) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| crate::tensor::bipolar(x) * crate::tensor::bipolar(y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::BitVec;

    #[test]
    fn test_count_equal_basic() {
        let a = BitVec::from_bits(&[true, false, true, true]);
        let b = BitVec::from_bits(&[true, true, false, true]);
        assert_eq!(count_diff(a.words(), b.words()), 2);
        assert_eq!(count_equal(a.words(), b.words(), 4), 2);
        assert_eq!(bipolar_sum(2, 4), 0);
    }

    #[test]
    fn test_all_zero_vectors_are_fully_equal() {
        // 0 同士（-1 × -1 = +1）は一致として数える
        let a = BitVec::zeros(9);
        assert_eq!(count_equal(a.words(), a.words(), 9), 9);
        assert_eq!(bipolar_sum(9, 9), 9);
    }

    #[test]
    fn test_bipolar_dot_extremes() {
        let ones = [true; 72];
        let zeros = [false; 72];
        assert_eq!(bipolar_dot(&ones, &ones), 72);
        assert_eq!(bipolar_dot(&zeros, &zeros), 72);
        assert_eq!(bipolar_dot(&ones, &zeros), -72);
    }
}
