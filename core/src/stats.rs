use crate::model::SnapshotFile;
use serde::{Deserialize, Serialize};

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub lines: usize,
    pub bytes: usize,
    pub words: usize,
}

/// Which text of a snapshot to show or search: one file, or every file concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSelector {
    All,
    File(String),
}

impl CorpusSelector {
    /// `None`, empty and `"all"` select the whole corpus.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") | Some("all") => CorpusSelector::All,
            Some(path) => CorpusSelector::File(path.to_string()),
        }
    }
}

/// Split text into lines on `\n` or `\r\n`. Empty text has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect()
}

pub fn compute_text_stats(text: &str) -> TextStats {
    let lines = if text.is_empty() { 0 } else { text.split('\n').count() };
    TextStats { lines, bytes: text.len(), words: text.split_whitespace().count() }
}

pub fn build_corpus_text(files: &[SnapshotFile], selector: &CorpusSelector) -> String {
    match selector {
        CorpusSelector::File(path) => files
            .iter()
            .find(|f| &f.path == path)
            .map(|f| f.content.clone())
            .unwrap_or_default(),
        CorpusSelector::All => {
            let mut sorted: Vec<&SnapshotFile> = files.iter().collect();
            sorted.sort_by(|a, b| a.path.cmp(&b.path));
            sorted
                .iter()
                .map(|f| format!("## {}\n\n{}", f.path, f.content))
                .collect::<Vec<_>>()
                .join(SECTION_SEPARATOR)
        }
    }
}
