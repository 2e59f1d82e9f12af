use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a snapshot in the caller's ordered list.
pub type SnapshotIdx = u32;
pub type FileIdx = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub content: String,
}

impl SnapshotFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }
}

/// One commit of the corpus: header fields plus the full set of files at that point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub idx: SnapshotIdx,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub files: Vec<SnapshotFile>,
    /// Named per-snapshot metrics used by the timeline, e.g. lines changed.
    #[serde(default)]
    pub magnitude: BTreeMap<String, f64>,
    #[serde(default)]
    pub reviewed: bool,
    /// Bitmask of the change buckets this snapshot falls into.
    #[serde(default)]
    pub buckets: u32,
}

impl Snapshot {
    pub fn new(idx: SnapshotIdx, short: impl Into<String>, files: Vec<SnapshotFile>) -> Self {
        Self { idx, short: short.into(), files, ..Self::default() }
    }

    pub fn file(&self, path: &str) -> Option<&SnapshotFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn metric(&self, key: &str) -> f64 {
        self.magnitude.get(key).copied().unwrap_or(0.0)
    }
}

/// Compact header served to listing views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub idx: SnapshotIdx,
    pub short: String,
    pub date: String,
    pub subject: String,
    pub file_count: usize,
}

impl From<&Snapshot> for SnapshotHeader {
    fn from(s: &Snapshot) -> Self {
        Self { idx: s.idx, short: s.short.clone(), date: s.date.clone(), subject: s.subject.clone(), file_count: s.files.len() }
    }
}
