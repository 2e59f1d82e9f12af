pub mod cache;
pub mod diff;
pub mod distance;
pub mod hash;
pub mod index;
pub mod model;
pub mod persist;
pub mod search;
pub mod stats;
pub mod summary;
pub mod timeline;
pub mod tokenizer;

pub use cache::LruCache;
pub use diff::{myers_diff_lines, myers_diff_text_lines, DiffKind, DiffOp, MyersOptions};
pub use distance::compute_edit_distance_lines;
pub use index::CorpusIndex;
pub use model::{Snapshot, SnapshotFile, SnapshotIdx};
pub use search::{search_single_commit, SearchHit};
pub use stats::{build_corpus_text, compute_text_stats, CorpusSelector, TextStats};
pub use summary::{compute_file_change_summary, compute_per_file_contribution, FileChangeSummary, FileContribution};
pub use timeline::{build_timeline_data, commit_index_to_position, playback_interval_ms, position_to_commit_index, TimelinePoint};
