use crate::hash::{fnv1a32, fnv1a32_bytes};
use crate::index::{CorpusIndex, Postings};
use crate::model::Snapshot;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub indexed: usize,
    pub total: usize,
    pub fingerprint: u32,
    pub created_at: String,
    pub version: u32,
}

#[derive(Deserialize)]
struct PostingsFile {
    indexed: usize,
    postings: Postings,
}

#[derive(Serialize)]
struct PostingsRef<'a> {
    indexed: usize,
    postings: &'a Postings,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Hash of every snapshot id, file path and file content, in order. A saved
/// index only loads against a list with the same fingerprint.
pub fn snapshots_fingerprint(snapshots: &[Snapshot]) -> u32 {
    let mut h = fnv1a32("");
    for s in snapshots {
        h = fnv1a32_bytes(h, s.short.as_bytes());
        h = fnv1a32_bytes(h, &[0]);
        for f in &s.files {
            h = fnv1a32_bytes(h, f.path.as_bytes());
            h = fnv1a32_bytes(h, &[0]);
            h = fnv1a32_bytes(h, &fnv1a32(&f.content).to_le_bytes());
        }
        h = fnv1a32_bytes(h, &[1]);
    }
    h
}

/// Load snapshots from a `.json` file (array or single object), a `.jsonl` file
/// (one per line) or a directory of such files. The result is sorted by `idx`.
pub fn load_snapshots<P: AsRef<Path>>(path: P) -> Result<Vec<Snapshot>> {
    let path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if path.is_dir() {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        bail!("snapshot input {} does not exist", path.display());
    }

    let mut snapshots = Vec::new();
    for file in files {
        let loaded = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)
        } else {
            read_json(&file)
        }
        .with_context(|| format!("reading snapshots from {}", file.display()))?;
        snapshots.extend(loaded);
    }
    snapshots.sort_by_key(|s| s.idx);
    tracing::info!(count = snapshots.len(), input = %path.display(), "loaded snapshots");
    Ok(snapshots)
}

fn read_jsonl(file: &Path) -> Result<Vec<Snapshot>> {
    let reader = BufReader::new(File::open(file)?);
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let snap: Snapshot = serde_json::from_str(&line).with_context(|| format!("line {}", n + 1))?;
        out.push(snap);
    }
    Ok(out)
}

fn read_json(file: &Path) -> Result<Vec<Snapshot>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(json)?),
        serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(json)?]),
        _ => bail!("expected a snapshot object or an array of snapshots"),
    }
}

pub fn save_index(paths: &IndexPaths, index: &CorpusIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let table = PostingsRef { indexed: index.indexed(), postings: index.postings() };
    let bytes = bincode::serialize(&table)?;
    File::create(paths.postings())?.write_all(&bytes)?;

    let meta = MetaFile {
        indexed: index.indexed(),
        total: index.total(),
        fingerprint: snapshots_fingerprint(index.snapshots()),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: INDEX_FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), indexed = meta.indexed, terms = index.term_count(), "index saved");
    Ok(())
}

/// Load a saved index for `snapshots`. Fails if the index was built from a different list.
pub fn load_index(paths: &IndexPaths, snapshots: Arc<Vec<Snapshot>>) -> Result<CorpusIndex> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_FORMAT_VERSION {
        bail!("index format version {} is not supported", meta.version);
    }
    let expected = snapshots_fingerprint(&snapshots);
    if meta.fingerprint != expected || meta.total != snapshots.len() {
        bail!("index at {} was built from a different snapshot list", paths.root.display());
    }
    let mut buf = Vec::new();
    File::open(paths.postings())
        .with_context(|| format!("opening {}", paths.postings().display()))?
        .read_to_end(&mut buf)?;
    let table: PostingsFile = bincode::deserialize(&buf)?;
    tracing::info!(root = %paths.root.display(), indexed = table.indexed, "index loaded");
    Ok(CorpusIndex::restore(snapshots, table.postings, table.indexed))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
