use crate::hash::hash_lines;
use crate::stats::split_lines;

/// Line-granularity Levenshtein distance between two texts, bounded by `max_cost`.
///
/// Returns the exact distance when it is `<= max_cost`, otherwise `max_cost + 1`.
/// The DP keeps two rows sized by the shorter text and gives up as soon as a
/// whole row exceeds the bound. Lines are compared by FNV-1a hash first and
/// confirmed by string equality.
pub fn compute_edit_distance_lines(text_a: &str, text_b: &str, max_cost: usize) -> usize {
    let a = split_lines(text_a);
    let b = split_lines(text_b);
    edit_distance_lines(&a, &b, max_cost)
}

pub fn edit_distance_lines(a: &[&str], b: &[&str], max_cost: usize) -> usize {
    let over = max_cost.saturating_add(1);
    if a.len().abs_diff(b.len()) > max_cost {
        return over;
    }
    // rows run along the shorter side
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }
    let hl = hash_lines(long);
    let hs = hash_lines(short);

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut cur: Vec<usize> = vec![0; short.len() + 1];
    for i in 1..=long.len() {
        cur[0] = i;
        let mut row_min = cur[0];
        for j in 1..=short.len() {
            let same = hl[i - 1] == hs[j - 1] && long[i - 1] == short[j - 1];
            let cost = if same { 0 } else { 1 };
            cur[j] = (prev[j - 1] + cost).min(prev[j] + 1).min(cur[j - 1] + 1);
            row_min = row_min.min(cur[j]);
        }
        if row_min > max_cost {
            return over;
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    let d = prev[short.len()];
    if d > max_cost { over } else { d }
}
