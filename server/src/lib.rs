use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::{Mutex, RwLock};
use revscope_core::diff::{edit_count, DiffKind};
use revscope_core::model::SnapshotHeader;
use revscope_core::persist::load_snapshots;
use revscope_core::stats::{build_corpus_text, compute_text_stats, CorpusSelector, TextStats};
use revscope_core::{
    build_timeline_data, compute_file_change_summary, compute_per_file_contribution, myers_diff_text_lines,
    search_single_commit, CorpusIndex, DiffOp, FileChangeSummary, FileContribution, LruCache, SearchHit, Snapshot,
    SnapshotIdx, TimelinePoint,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Snapshots indexed per background tick.
    pub batch_size: usize,
    pub tick: Duration,
    /// Number of diffs kept in the LRU cache.
    pub cache_size: usize,
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { batch_size: 8, tick: Duration::from_millis(50), cache_size: 256, admin_token: None }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<Vec<Snapshot>>,
    /// `Snapshot::idx` to list position; every route addresses snapshots by `idx`.
    pub positions: Arc<HashMap<SnapshotIdx, usize>>,
    pub index: Arc<RwLock<CorpusIndex>>,
    pub diff_cache: Arc<Mutex<LruCache<DiffResponse>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(snapshots: Vec<Snapshot>, config: &ServerConfig) -> Self {
        let mut positions = HashMap::with_capacity(snapshots.len());
        for (pos, s) in snapshots.iter().enumerate() {
            positions.entry(s.idx).or_insert(pos);
        }
        let snapshots = Arc::new(snapshots);
        let mut index = CorpusIndex::new();
        index.init(snapshots.clone());
        Self {
            snapshots,
            positions: Arc::new(positions),
            index: Arc::new(RwLock::new(index)),
            diff_cache: Arc::new(Mutex::new(LruCache::new(config.cache_size))),
            admin_token: config.admin_token.clone(),
        }
    }

    fn snapshot(&self, idx: SnapshotIdx) -> Result<&Snapshot, ApiError> {
        self.positions
            .get(&idx)
            .and_then(|&pos| self.snapshots.get(pos))
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("snapshot {idx} not found")))
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Search only the snapshot with this `idx`.
    pub commit: Option<SnapshotIdx>,
}
fn default_k() -> usize { 50 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub total_hits: usize,
    pub indexed: usize,
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Deserialize)]
pub struct PairParams {
    pub from: SnapshotIdx,
    pub to: SnapshotIdx,
}

#[derive(Deserialize)]
pub struct DiffParams {
    pub from: SnapshotIdx,
    pub to: SnapshotIdx,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffResponse {
    pub path: String,
    pub adds: usize,
    pub dels: usize,
    pub ops: Vec<DiffOp>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: FileChangeSummary,
    pub movers: Vec<FileContribution>,
}

#[derive(Deserialize)]
pub struct TimelineParams {
    pub metric: String,
    pub bucket: Option<u32>,
}

#[derive(Deserialize)]
pub struct CorpusParams {
    pub path: Option<String>,
}

#[derive(Serialize)]
pub struct CorpusResponse {
    pub idx: SnapshotIdx,
    pub path: Option<String>,
    pub stats: TextStats,
    pub text: String,
}

/// Load snapshots from disk and build the router plus its shared state.
pub fn build_app(snapshots_path: &str, config: &ServerConfig) -> Result<(Router, AppState)> {
    let snapshots = load_snapshots(snapshots_path)?;
    let state = AppState::new(snapshots, config);
    Ok((router(state.clone()), state))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/commits", get(commits_handler))
        .route("/search", get(search_handler))
        .route("/diff", get(diff_handler))
        .route("/summary", get(summary_handler))
        .route("/timeline", get(timeline_handler))
        .route("/corpus/:idx", get(corpus_handler))
        .route("/index/reset", post(index_reset))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Index `batch_size` snapshots per tick until the corpus is covered, then idle
/// until a reset makes work available again.
pub fn spawn_indexer(state: AppState, batch_size: usize, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        let mut was_busy = false;
        loop {
            interval.tick().await;
            if !state.index.read().has_more() {
                continue;
            }
            let mut index = state.index.write();
            let more = index.index_batch(batch_size);
            if !more {
                tracing::info!(indexed = index.indexed(), terms = index.term_count(), "index complete");
            } else if !was_busy {
                tracing::info!(total = index.total(), "background indexing started");
            }
            was_busy = more;
        }
    })
}

pub async fn commits_handler(State(state): State<AppState>) -> Json<Vec<SnapshotHeader>> {
    Json(state.snapshots.iter().map(SnapshotHeader::from).collect())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let k = params.k.clamp(1, 500);
    let (results, indexed, total) = match params.commit {
        Some(pos) => {
            let snap = state.snapshot(pos)?;
            let results = search_single_commit(snap, &params.q, k);
            let index = state.index.read();
            (results, index.indexed(), index.total())
        }
        None => {
            let index = state.index.read();
            (index.search(&params.q, k), index.indexed(), index.total())
        }
    };
    Ok(Json(SearchResponse {
        query: params.q,
        took_ms: start.elapsed().as_millis(),
        total_hits: results.len(),
        indexed,
        total,
        results,
    }))
}

pub async fn diff_handler(
    State(state): State<AppState>,
    Query(params): Query<DiffParams>,
) -> Result<Json<DiffResponse>, ApiError> {
    let a = state.snapshot(params.from)?;
    let b = state.snapshot(params.to)?;
    let key = format!("{}:{}:{}", params.from, params.to, params.path);
    let cached = state.diff_cache.lock().get(&key).cloned();
    if let Some(hit) = cached {
        return Ok(Json(hit));
    }

    let content = |s: &Snapshot| s.file(&params.path).map(|f| f.content.clone());
    let (old, new) = (content(a), content(b));
    if old.is_none() && new.is_none() {
        return Err((StatusCode::NOT_FOUND, format!("{} not in either snapshot", params.path)));
    }
    // up to the Myers time budget of CPU; keep it off the async workers
    let ops = tokio::task::spawn_blocking(move || {
        myers_diff_text_lines(old.as_deref().unwrap_or(""), new.as_deref().unwrap_or(""))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("diff task failed: {e}")))?;
    let adds = ops.iter().filter(|o| o.kind == DiffKind::Add).count();
    let resp = DiffResponse { path: params.path, adds, dels: edit_count(&ops) - adds, ops };
    state.diff_cache.lock().set(key, resp.clone());
    Ok(Json(resp))
}

pub async fn summary_handler(
    State(state): State<AppState>,
    Query(params): Query<PairParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let a = state.snapshot(params.from)?;
    let b = state.snapshot(params.to)?;
    Ok(Json(SummaryResponse {
        summary: compute_file_change_summary(&a.files, &b.files),
        movers: compute_per_file_contribution(&a.files, &b.files),
    }))
}

pub async fn timeline_handler(
    State(state): State<AppState>,
    Query(params): Query<TimelineParams>,
) -> Json<Vec<TimelinePoint>> {
    Json(build_timeline_data(&state.snapshots, &params.metric, params.bucket))
}

pub async fn corpus_handler(
    State(state): State<AppState>,
    Path(idx): Path<SnapshotIdx>,
    Query(params): Query<CorpusParams>,
) -> Result<Json<CorpusResponse>, ApiError> {
    let snap = state.snapshot(idx)?;
    let selector = CorpusSelector::from_param(params.path.as_deref());
    let text = build_corpus_text(&snap.files, &selector);
    let path = match selector {
        CorpusSelector::File(p) => Some(p),
        CorpusSelector::All => None,
    };
    Ok(Json(CorpusResponse { idx, path, stats: compute_text_stats(&text), text }))
}

async fn index_reset(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut index = state.index.write();
    index.init(state.snapshots.clone());
    tracing::info!(total = index.total(), "index reset");
    Ok(Json(serde_json::json!({ "indexed": index.indexed(), "total": index.total() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
