use crate::model::{Snapshot, SnapshotIdx};
use crate::stats::split_lines;
use crate::tokenizer::{fold_case, fold_char};
use serde::{Deserialize, Serialize};

/// Max chars of context kept before a match.
pub const LEFT_CONTEXT: usize = 40;
/// Max chars of context kept after a match.
pub const RIGHT_CONTEXT: usize = 60;
pub const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub snapshot_idx: SnapshotIdx,
    pub short: String,
    pub date: String,
    pub subject: String,
    pub path: String,
    /// 1-based.
    pub line: usize,
    pub snippet: String,
    /// Byte offset of the match inside `snippet`.
    pub match_start: usize,
    /// Byte length of the match inside `snippet`.
    pub match_len: usize,
}

impl SearchHit {
    pub fn matched_text(&self) -> &str {
        &self.snippet[self.match_start..self.match_start + self.match_len]
    }
}

/// A case-folded copy of a line that remembers where each of its chars came from,
/// so matches found in the lowered text map back onto the original bytes even
/// when lowercasing changes byte lengths.
struct FoldedLine {
    text: String,
    // (offset in text, original char start, original char end)
    spans: Vec<(usize, usize, usize)>,
}

impl FoldedLine {
    fn new(line: &str) -> Self {
        let mut text = String::with_capacity(line.len());
        let mut spans = Vec::with_capacity(line.len());
        for (ob, c) in line.char_indices() {
            let oe = ob + c.len_utf8();
            for lc in fold_char(c) {
                spans.push((text.len(), ob, oe));
                text.push(lc);
            }
        }
        Self { text, spans }
    }

    fn span_at(&self, pos: usize) -> (usize, usize, usize) {
        let i = self.spans.partition_point(|s| s.0 <= pos);
        self.spans[i.saturating_sub(1)]
    }

    /// Original byte range covering lowered range `[start, end)`.
    fn original_range(&self, start: usize, end: usize) -> (usize, usize) {
        (self.span_at(start).1, self.span_at(end - 1).2)
    }
}

fn snippet_for(line: &str, start: usize, end: usize) -> (String, usize) {
    let before = &line[..start];
    let mut left = start;
    let mut left_cut = false;
    for (n, (off, _)) in before.char_indices().rev().enumerate() {
        if n == LEFT_CONTEXT {
            left_cut = true;
            break;
        }
        left = off;
    }
    let (right, right_cut) = match line[end..].char_indices().nth(RIGHT_CONTEXT) {
        Some((off, _)) => (end + off, true),
        None => (line.len(), false),
    };

    let mut snippet = String::with_capacity(right - left + 2 * ELLIPSIS.len());
    if left_cut {
        snippet.push_str(ELLIPSIS);
    }
    let match_start = snippet.len() + (start - left);
    snippet.push_str(&line[left..right]);
    if right_cut {
        snippet.push_str(ELLIPSIS);
    }
    (snippet, match_start)
}

/// Case-insensitive substring search over every line of every file in one snapshot.
/// A line may yield several hits; the scan stops after `max_hits`.
pub fn search_single_commit(snapshot: &Snapshot, query: &str, max_hits: usize) -> Vec<SearchHit> {
    let needle = fold_case(query);
    let mut hits = Vec::new();
    if needle.is_empty() || max_hits == 0 {
        return hits;
    }
    for file in &snapshot.files {
        for (line_no, line) in split_lines(&file.content).into_iter().enumerate() {
            let folded = FoldedLine::new(line);
            let mut from = 0;
            while let Some(rel) = folded.text[from..].find(&needle) {
                let at = from + rel;
                let (start, end) = folded.original_range(at, at + needle.len());
                let (snippet, match_start) = snippet_for(line, start, end);
                hits.push(SearchHit {
                    snapshot_idx: snapshot.idx,
                    short: snapshot.short.clone(),
                    date: snapshot.date.clone(),
                    subject: snapshot.subject.clone(),
                    path: file.path.clone(),
                    line: line_no + 1,
                    snippet,
                    match_start,
                    match_len: end - start,
                });
                if hits.len() >= max_hits {
                    return hits;
                }
                // resume just past the start of this match
                from = at + folded.text[at..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SnapshotFile;

    fn snap(files: Vec<SnapshotFile>) -> Snapshot {
        Snapshot::new(3, "abc1234", files)
    }

    #[test]
    fn finds_case_insensitive_with_line_numbers() {
        let s = snap(vec![SnapshotFile::new("a.md", "intro\nThe Widget renders\nno match")]);
        let hits = search_single_commit(&s, "widget", 10);
        assert_eq!(hits.len(), 1);
        let h = &hits[0];
        assert_eq!(h.line, 2);
        assert_eq!(h.path, "a.md");
        assert_eq!(h.snapshot_idx, 3);
        assert_eq!(h.snippet, "The Widget renders");
        assert_eq!(h.matched_text(), "Widget");
    }

    #[test]
    fn multiple_and_overlapping_matches_per_line() {
        let s = snap(vec![SnapshotFile::new("a.md", "aaaa")]);
        let hits = search_single_commit(&s, "aa", 10);
        let starts: Vec<usize> = hits.iter().map(|h| h.match_start).collect();
        assert_eq!(starts, vec![0, 1, 2]);
    }

    #[test]
    fn respects_max_hits() {
        let s = snap(vec![
            SnapshotFile::new("a.md", "foo foo\nfoo"),
            SnapshotFile::new("b.md", "foo"),
        ]);
        assert_eq!(search_single_commit(&s, "foo", 2).len(), 2);
        assert_eq!(search_single_commit(&s, "foo", 100).len(), 4);
        assert!(search_single_commit(&s, "foo", 0).is_empty());
        assert!(search_single_commit(&s, "", 10).is_empty());
    }

    #[test]
    fn long_lines_are_trimmed_with_ellipses() {
        let line = format!("{}needle{}", "l".repeat(100), "r".repeat(100));
        let s = snap(vec![SnapshotFile::new("a.md", &line)]);
        let h = &search_single_commit(&s, "NEEDLE", 1)[0];
        assert!(h.snippet.starts_with(ELLIPSIS));
        assert!(h.snippet.ends_with(ELLIPSIS));
        assert_eq!(h.matched_text(), "needle");
        let body = h.snippet.trim_start_matches(ELLIPSIS).trim_end_matches(ELLIPSIS);
        assert_eq!(body.chars().count(), LEFT_CONTEXT + 6 + RIGHT_CONTEXT);
    }

    #[test]
    fn final_sigma_query_matches_capital_sigma() {
        let s = snap(vec![SnapshotFile::new("a.md", "ΟΔΟΣ ΚΑΙ")]);
        let h = &search_single_commit(&s, "οδος", 1)[0];
        assert_eq!(h.matched_text(), "ΟΔΟΣ");
    }

    #[test]
    fn offsets_survive_length_changing_lowercase() {
        // 'İ' lowercases to two chars, shifting byte offsets in the folded text
        let s = snap(vec![SnapshotFile::new("a.md", "İİ café Ünïcode")]);
        let h = &search_single_commit(&s, "ünï", 1)[0];
        assert_eq!(h.matched_text(), "Ünï");
    }
}
