use crate::model::SnapshotFile;
use crate::stats::compute_text_stats;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Classification of every path present in either of two snapshots.
/// Each path lands in exactly one list; all lists are sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

impl FileChangeSummary {
    pub fn changed_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContribution {
    pub path: String,
    pub delta_lines: i64,
    pub delta_bytes: i64,
}

fn content_map(files: &[SnapshotFile]) -> BTreeMap<&str, &str> {
    files.iter().map(|f| (f.path.as_str(), f.content.as_str())).collect()
}

pub fn compute_file_change_summary(a: &[SnapshotFile], b: &[SnapshotFile]) -> FileChangeSummary {
    let map_a = content_map(a);
    let map_b = content_map(b);
    let paths: BTreeSet<&str> = map_a.keys().chain(map_b.keys()).copied().collect();

    let mut out = FileChangeSummary::default();
    for path in paths {
        let bucket = match (map_a.get(path), map_b.get(path)) {
            (None, Some(_)) => &mut out.added,
            (Some(_), None) => &mut out.removed,
            (Some(ca), Some(cb)) if ca == cb => &mut out.unchanged,
            (Some(_), Some(_)) => &mut out.modified,
            (None, None) => continue,
        };
        bucket.push(path.to_string());
    }
    out
}

/// Line and byte deltas (b minus a) per path, biggest byte movers first.
/// Missing files count as empty content.
pub fn compute_per_file_contribution(a: &[SnapshotFile], b: &[SnapshotFile]) -> Vec<FileContribution> {
    let map_a = content_map(a);
    let map_b = content_map(b);
    let paths: BTreeSet<&str> = map_a.keys().chain(map_b.keys()).copied().collect();

    let mut out: Vec<FileContribution> = paths
        .into_iter()
        .map(|path| {
            let sa = compute_text_stats(map_a.get(path).copied().unwrap_or(""));
            let sb = compute_text_stats(map_b.get(path).copied().unwrap_or(""));
            FileContribution {
                path: path.to_string(),
                delta_lines: sb.lines as i64 - sa.lines as i64,
                delta_bytes: sb.bytes as i64 - sa.bytes as i64,
            }
        })
        .collect();
    out.sort_by(|x, y| y.delta_bytes.abs().cmp(&x.delta_bytes.abs()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(path: &str, content: &str) -> SnapshotFile { SnapshotFile::new(path, content) }

    #[test]
    fn classifies_every_path_once() {
        let a = vec![f("keep.md", "same"), f("edit.md", "v1"), f("gone.md", "x")];
        let b = vec![f("new.md", "y"), f("edit.md", "v2"), f("keep.md", "same")];
        let s = compute_file_change_summary(&a, &b);
        assert_eq!(s.added, vec!["new.md"]);
        assert_eq!(s.removed, vec!["gone.md"]);
        assert_eq!(s.modified, vec!["edit.md"]);
        assert_eq!(s.unchanged, vec!["keep.md"]);
        assert_eq!(s.changed_count(), 3);
    }

    #[test]
    fn lists_are_sorted() {
        let a = vec![];
        let b = vec![f("z.md", ""), f("a.md", ""), f("m.md", "")];
        let s = compute_file_change_summary(&a, &b);
        assert_eq!(s.added, vec!["a.md", "m.md", "z.md"]);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(compute_file_change_summary(&[], &[]), FileChangeSummary::default());
        assert!(compute_per_file_contribution(&[], &[]).is_empty());
    }

    #[test]
    fn contribution_ranks_by_abs_byte_delta() {
        let a = vec![f("small.md", "ab"), f("shrunk.md", "0123456789\n0123456789")];
        let b = vec![f("small.md", "abc"), f("grown.md", "12345")];
        let c = compute_per_file_contribution(&a, &b);
        let paths: Vec<&str> = c.iter().map(|x| x.path.as_str()).collect();
        assert_eq!(paths, vec!["shrunk.md", "grown.md", "small.md"]);
        assert_eq!(c[0].delta_bytes, -21);
        assert_eq!(c[0].delta_lines, -2);
        assert_eq!(c[1].delta_lines, 1);
        assert_eq!(c[2].delta_bytes, 1);
    }
}
