//! Line diff using Myers' O((N+M)D) shortest-edit-script search.
//!
//! The forward pass records the furthest-reaching x per diagonal `k = x - y`
//! for every edit distance `d`; the backtrack walks that trace from the end
//! corner back to the origin. A wall-clock budget bounds the search: when it
//! runs out the result degrades to "delete all of A, add all of B", which is
//! still a valid (if unhelpful) script.

use crate::hash::hash_lines;
use crate::stats::split_lines;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const MYERS_TIME_BUDGET: Duration = Duration::from_millis(500);
/// The clock is read once every this many values of `d`.
pub const MYERS_CHECK_INTERVAL: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Equal,
    Add,
    Del,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOp {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffOp {
    fn new(kind: DiffKind, text: &str) -> Self { Self { kind, text: text.to_string() } }
}

#[derive(Debug, Clone, Copy)]
pub struct MyersOptions {
    pub time_budget: Duration,
    pub check_interval: usize,
}

impl Default for MyersOptions {
    fn default() -> Self {
        Self { time_budget: MYERS_TIME_BUDGET, check_interval: MYERS_CHECK_INTERVAL }
    }
}

/// Number of add + del ops in a script.
pub fn edit_count(ops: &[DiffOp]) -> usize {
    ops.iter().filter(|o| o.kind != DiffKind::Equal).count()
}

/// Rebuild the old (`Equal`+`Del`) or new (`Equal`+`Add`) side of a script.
pub fn reconstruct(ops: &[DiffOp], side: DiffKind) -> Vec<&str> {
    ops.iter()
        .filter(|o| o.kind == DiffKind::Equal || o.kind == side)
        .map(|o| o.text.as_str())
        .collect()
}

pub fn myers_diff_text_lines(text_a: &str, text_b: &str) -> Vec<DiffOp> {
    myers_diff_lines(&split_lines(text_a), &split_lines(text_b))
}

pub fn myers_diff_lines(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    myers_diff_lines_with(a, b, MyersOptions::default())
}

pub fn myers_diff_lines_with(a: &[&str], b: &[&str], opts: MyersOptions) -> Vec<DiffOp> {
    if a.is_empty() {
        return b.iter().map(|l| DiffOp::new(DiffKind::Add, l)).collect();
    }
    if b.is_empty() {
        return a.iter().map(|l| DiffOp::new(DiffKind::Del, l)).collect();
    }
    match forward(a, b, opts) {
        Some(trace) => backtrack(a, b, &trace),
        None => replace_all(a, b),
    }
}

/// Reach values recorded before step `d`, covering diagonals `-(d+1)..=d+1`.
/// Row `d` holds `2d + 3` entries, so the whole trace is O(D²) regardless of input size.
struct Trace {
    rows: Vec<Vec<isize>>,
}

impl Trace {
    fn reach(&self, d: usize, k: isize) -> isize {
        self.rows[d][(k + d as isize + 1) as usize]
    }

    fn d(&self) -> usize {
        self.rows.len() - 1
    }

    #[cfg(test)]
    fn cells(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Forward search. `None` when the time budget runs out first.
fn forward(a: &[&str], b: &[&str], opts: MyersOptions) -> Option<Trace> {
    let ha = hash_lines(a);
    let hb = hash_lines(b);
    let same = |x: usize, y: usize| ha[x] == hb[y] && a[x] == b[y];

    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    // one spare slot each side so the d = max window stays in bounds
    let offset = max as isize + 1;
    let mut v = vec![0isize; 2 * max + 3];
    let mut rows: Vec<Vec<isize>> = Vec::new();
    let started = Instant::now();
    let interval = opts.check_interval.max(1);

    for d in 0..=max {
        if d > 0 && d % interval == 0 && started.elapsed() > opts.time_budget {
            tracing::warn!(
                d,
                lines_a = a.len(),
                lines_b = b.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "myers diff over time budget; falling back to full replace"
            );
            return None;
        }
        let d_i = d as isize;
        rows.push(v[(offset - d_i - 1) as usize..=(offset + d_i + 1) as usize].to_vec());
        let mut k = -d_i;
        while k <= d_i {
            let idx = (k + offset) as usize;
            let mut x = if k == -d_i || (k != d_i && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && same(x as usize, y as usize) {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                return Some(Trace { rows });
            }
            k += 2;
        }
    }
    // d = n + m always reaches the corner
    None
}

fn backtrack(a: &[&str], b: &[&str], trace: &Trace) -> Vec<DiffOp> {
    let d_final = trace.d();
    let mut ops = Vec::with_capacity(a.len().max(b.len()) + d_final);
    let mut x = a.len() as isize;
    let mut y = b.len() as isize;

    for d in (0..=d_final).rev() {
        let d_i = d as isize;
        let k = x - y;
        let prev_k = if k == -d_i || (k != d_i && trace.reach(d, k - 1) < trace.reach(d, k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = trace.reach(d, prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(DiffOp::new(DiffKind::Equal, a[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(DiffOp::new(DiffKind::Add, b[(y - 1) as usize]));
            } else {
                ops.push(DiffOp::new(DiffKind::Del, a[(x - 1) as usize]));
            }
            x = prev_x;
            y = prev_y;
        }
    }
    ops.reverse();
    ops
}

fn replace_all(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    a.iter()
        .map(|l| DiffOp::new(DiffKind::Del, l))
        .chain(b.iter().map(|l| DiffOp::new(DiffKind::Add, l)))
        .collect()
}
