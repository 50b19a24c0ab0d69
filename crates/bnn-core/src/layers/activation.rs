//! Sign 活性化 / Argmax

use crate::tensor::BitVec;

/// Sign 活性化: `x > 0` なら 1、それ以外（0 を含む）は 0
pub fn sign(input: &[i32]) -> BitVec {
    input.iter().map(|&x| x > 0).collect()
}

/// 最大値の添字を返す
///
/// 同値の場合は先頭が勝つ（走行中の最大値との比較は厳密な `>`）。
/// 空入力は 0 を返す（クラス数は構築時に 1 以上であることを検証済み）。
pub fn argmax(input: &[i32]) -> usize {
    let Some((&first, rest)) = input.split_first() else {
        return 0;
    };

    let mut max = first;
    let mut max_id = 0;
    for (i, &v) in rest.iter().enumerate() {
        if v > max {
            max = v;
            max_id = i + 1;
        }
    }
    max_id
}
