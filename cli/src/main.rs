use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use revscope_core::diff::{edit_count, DiffKind};
use revscope_core::persist::{load_index, load_snapshots, save_index, IndexPaths};
use revscope_core::stats::{build_corpus_text, compute_text_stats, CorpusSelector};
use revscope_core::{
    build_timeline_data, compute_edit_distance_lines, compute_file_change_summary, compute_per_file_contribution,
    myers_diff_text_lines, search_single_commit, CorpusIndex, SearchHit, Snapshot, SnapshotIdx,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "revscope")]
#[command(about = "Diff, search and summarize a sequence of text snapshots", long_about = None)]
struct Cli {
    /// Snapshot input (.json, .jsonl, or a directory of them)
    #[arg(long, global = true, default_value = "./snapshots")]
    input: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cross-snapshot search index and save it
    Index {
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Snapshots indexed per batch
        #[arg(long, default_value_t = 16)]
        batch_size: usize,
    },
    /// Search one snapshot (--commit) or all of them
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 50)]
        max_hits: usize,
        /// `idx` of the snapshot to search
        #[arg(long)]
        commit: Option<SnapshotIdx>,
        /// Saved index directory; indexes in memory when absent or stale
        #[arg(long)]
        index: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Line diff between two snapshots
    Diff {
        #[arg(long)]
        from: SnapshotIdx,
        #[arg(long)]
        to: SnapshotIdx,
        /// Restrict to one file
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Added/removed/modified files and the biggest movers
    Summary {
        #[arg(long)]
        from: SnapshotIdx,
        #[arg(long)]
        to: SnapshotIdx,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Normalized per-snapshot metric for a scrub bar
    Timeline {
        #[arg(long)]
        metric: String,
        /// Bucket bitmask to highlight
        #[arg(long)]
        bucket: Option<u32>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Line/byte/word counts of one file or the whole snapshot
    Stats {
        #[arg(long)]
        commit: SnapshotIdx,
        #[arg(long)]
        path: Option<String>,
    },
    /// Bounded line edit distance of one file between two snapshots
    Distance {
        #[arg(long)]
        from: SnapshotIdx,
        #[arg(long)]
        to: SnapshotIdx,
        #[arg(long)]
        path: String,
        #[arg(long, default_value_t = 200)]
        max_cost: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let snapshots = Arc::new(load_snapshots(&cli.input)?);

    match cli.command {
        Commands::Index { output, batch_size } => build_index(snapshots, &output, batch_size),
        Commands::Search { query, max_hits, commit, index, json } => {
            run_search(snapshots, &query, max_hits, commit, index.as_deref(), json)
        }
        Commands::Diff { from, to, path, json } => run_diff(&snapshots, from, to, path.as_deref(), json),
        Commands::Summary { from, to, json } => run_summary(&snapshots, from, to, json),
        Commands::Timeline { metric, bucket, json } => {
            let points = build_timeline_data(&snapshots, &metric, bucket);
            if json {
                return print_json(&points);
            }
            for p in points {
                let bar = "#".repeat((p.value * 40.0).round() as usize);
                let mark = if p.matches_filter { ' ' } else { '.' };
                println!("{:>5}{} {:<40} {}", p.idx, mark, bar, p.raw);
            }
            Ok(())
        }
        Commands::Stats { commit, path } => {
            let snap = pick(&snapshots, commit)?;
            let text = build_corpus_text(&snap.files, &CorpusSelector::from_param(path.as_deref()));
            let stats = compute_text_stats(&text);
            println!("lines={} bytes={} words={}", stats.lines, stats.bytes, stats.words);
            Ok(())
        }
        Commands::Distance { from, to, path, max_cost } => {
            let a = file_content(pick(&snapshots, from)?, &path);
            let b = file_content(pick(&snapshots, to)?, &path);
            let d = compute_edit_distance_lines(a, b, max_cost);
            if d > max_cost {
                println!(">{max_cost}");
            } else {
                println!("{d}");
            }
            Ok(())
        }
    }
}

fn pick(snapshots: &[Snapshot], idx: SnapshotIdx) -> Result<&Snapshot> {
    match snapshots.iter().find(|s| s.idx == idx) {
        Some(s) => Ok(s),
        None => bail!("no snapshot with idx {idx} ({} loaded)", snapshots.len()),
    }
}

fn file_content<'a>(snap: &'a Snapshot, path: &str) -> &'a str {
    snap.file(path).map(|f| f.content.as_str()).unwrap_or("")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialize json")?);
    Ok(())
}

fn build_index(snapshots: Arc<Vec<Snapshot>>, output: &str, batch_size: usize) -> Result<()> {
    let start = Instant::now();
    let mut index = CorpusIndex::new();
    index.init(snapshots);
    while index.index_batch(batch_size) {
        tracing::info!(indexed = index.indexed(), total = index.total(), "indexing");
    }
    tracing::info!(
        indexed = index.indexed(),
        terms = index.term_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index build complete"
    );
    save_index(&IndexPaths::new(output), &index)
}

fn open_index(snapshots: Arc<Vec<Snapshot>>, dir: Option<&str>) -> CorpusIndex {
    if let Some(dir) = dir {
        match load_index(&IndexPaths::new(dir), snapshots.clone()) {
            Ok(mut index) => {
                // a partial save is finished in memory
                while index.index_batch(64) {}
                return index;
            }
            Err(e) => tracing::warn!(error = %e, "saved index unusable; indexing in memory"),
        }
    }
    let mut index = CorpusIndex::new();
    index.init(snapshots);
    while index.index_batch(64) {}
    index
}

fn run_search(
    snapshots: Arc<Vec<Snapshot>>,
    query: &str,
    max_hits: usize,
    commit: Option<SnapshotIdx>,
    index_dir: Option<&str>,
    json: bool,
) -> Result<()> {
    let hits: Vec<SearchHit> = match commit {
        Some(idx) => search_single_commit(pick(&snapshots, idx)?, query, max_hits),
        None => open_index(snapshots, index_dir).search(query, max_hits),
    };
    if json {
        return print_json(&hits);
    }
    for h in &hits {
        println!("{} {}:{}: {}", h.short, h.path, h.line, h.snippet);
    }
    println!("{} hits", hits.len());
    Ok(())
}

fn run_diff(snapshots: &[Snapshot], from: SnapshotIdx, to: SnapshotIdx, path: Option<&str>, json: bool) -> Result<()> {
    let a = pick(snapshots, from)?;
    let b = pick(snapshots, to)?;
    let paths: Vec<String> = match path {
        Some(p) => vec![p.to_string()],
        None => {
            let s = compute_file_change_summary(&a.files, &b.files);
            s.added.into_iter().chain(s.removed).chain(s.modified).collect()
        }
    };

    #[derive(Serialize)]
    struct FileDiff {
        path: String,
        edits: usize,
        ops: Vec<revscope_core::DiffOp>,
    }

    let mut diffs = Vec::with_capacity(paths.len());
    for p in paths {
        let ops = myers_diff_text_lines(file_content(a, &p), file_content(b, &p));
        diffs.push(FileDiff { edits: edit_count(&ops), path: p, ops });
    }
    if json {
        return print_json(&diffs);
    }
    for d in &diffs {
        println!("--- {}@{}\n+++ {}@{}", d.path, a.short, d.path, b.short);
        for op in &d.ops {
            let sign = match op.kind {
                DiffKind::Equal => ' ',
                DiffKind::Add => '+',
                DiffKind::Del => '-',
            };
            println!("{sign}{}", op.text);
        }
    }
    println!("{} files changed", diffs.iter().filter(|d| d.edits > 0).count());
    Ok(())
}

fn run_summary(snapshots: &[Snapshot], from: SnapshotIdx, to: SnapshotIdx, json: bool) -> Result<()> {
    let a = pick(snapshots, from)?;
    let b = pick(snapshots, to)?;
    let summary = compute_file_change_summary(&a.files, &b.files);
    let movers = compute_per_file_contribution(&a.files, &b.files);
    if json {
        return print_json(&serde_json::json!({ "summary": summary, "movers": movers }));
    }
    for p in &summary.added { println!("A {p}"); }
    for p in &summary.removed { println!("D {p}"); }
    for p in &summary.modified { println!("M {p}"); }
    println!("{} changed, {} unchanged", summary.changed_count(), summary.unchanged.len());
    for m in movers.iter().filter(|m| m.delta_bytes != 0).take(10) {
        println!("{:>+8} bytes {:>+6} lines  {}", m.delta_bytes, m.delta_lines, m.path);
    }
    Ok(())
}
