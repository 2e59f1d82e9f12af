//! Incremental inverted index over an ordered list of snapshots.
//!
//! Postings only record which (snapshot, file) pairs contain a token. Queries
//! first intersect snapshot sets per token, then re-scan each candidate with
//! [`search_single_commit`] to recover exact lines and offsets.

use crate::model::{FileIdx, Snapshot};
use crate::search::{search_single_commit, SearchHit};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Position of a snapshot in the indexed list (not `Snapshot::idx`).
pub type Position = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub snapshot: Position,
    pub file: FileIdx,
}

pub type Postings = HashMap<String, Vec<Posting>>;

#[derive(Default)]
pub struct CorpusIndex {
    snapshots: Arc<Vec<Snapshot>>,
    postings: Postings,
    indexed: usize,
}

impl CorpusIndex {
    pub fn new() -> Self { Self::default() }

    /// Reset and adopt `snapshots`. Nothing is indexed until [`index_batch`](Self::index_batch).
    pub fn init(&mut self, snapshots: Arc<Vec<Snapshot>>) {
        self.clear();
        self.snapshots = snapshots;
    }

    /// Rebuild from saved postings. `indexed` is clamped to the snapshot count.
    pub fn restore(snapshots: Arc<Vec<Snapshot>>, postings: Postings, indexed: usize) -> Self {
        let indexed = indexed.min(snapshots.len());
        Self { snapshots, postings, indexed }
    }

    /// Index the next `batch_size` snapshots (at least one). Returns true while
    /// more remain, so callers can spread the work over several ticks.
    pub fn index_batch(&mut self, batch_size: usize) -> bool {
        let end = (self.indexed + batch_size.max(1)).min(self.snapshots.len());
        for pos in self.indexed..end {
            let snapshot = &self.snapshots[pos];
            for (file_idx, file) in snapshot.files.iter().enumerate() {
                let posting = Posting { snapshot: pos as Position, file: file_idx as FileIdx };
                for token in tokenize(&file.content) {
                    let list = self.postings.entry(token).or_default();
                    // a file's tokens are visited together, so checking the tail is enough
                    if list.last() != Some(&posting) {
                        list.push(posting);
                    }
                }
            }
        }
        self.indexed = end;
        tracing::debug!(indexed = self.indexed, total = self.snapshots.len(), terms = self.postings.len(), "index batch");
        self.has_more()
    }

    pub fn has_more(&self) -> bool {
        self.indexed < self.snapshots.len()
    }

    pub fn indexed(&self) -> usize { self.indexed }

    pub fn total(&self) -> usize { self.snapshots.len() }

    pub fn snapshots(&self) -> &Arc<Vec<Snapshot>> { &self.snapshots }

    pub fn postings(&self) -> &Postings { &self.postings }

    pub fn term_count(&self) -> usize { self.postings.len() }

    /// Positions of indexed snapshots containing every token of `query`.
    pub fn candidates(&self, query: &str) -> BTreeSet<Position> {
        let tokens = tokenize(query);
        let mut acc: Option<BTreeSet<Position>> = None;
        for token in &tokens {
            let set: BTreeSet<Position> = self
                .postings
                .get(token)
                .map(|list| list.iter().map(|p| p.snapshot).collect())
                .unwrap_or_default();
            acc = Some(match acc {
                None => set,
                Some(prev) => prev.intersection(&set).copied().collect(),
            });
            if acc.as_ref().is_some_and(|s| s.is_empty()) {
                break;
            }
        }
        acc.unwrap_or_default()
    }

    /// AND search across indexed snapshots, newest first, up to `max_hits` exact hits.
    pub fn search(&self, query: &str, max_hits: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if max_hits == 0 {
            return hits;
        }
        for pos in self.candidates(query).into_iter().rev() {
            let snapshot = &self.snapshots[pos as usize];
            hits.extend(search_single_commit(snapshot, query, max_hits - hits.len()));
            if hits.len() >= max_hits {
                break;
            }
        }
        hits
    }

    pub fn clear(&mut self) {
        self.postings = HashMap::new();
        self.snapshots = Arc::new(Vec::new());
        self.indexed = 0;
    }
}
