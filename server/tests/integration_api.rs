use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use revscope_core::{Snapshot, SnapshotFile};
use revscope_server::{build_app, router, spawn_indexer, AppState, ServerConfig};
use serde_json::Value;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

fn tiny_corpus() -> Vec<Snapshot> {
    let mut s0 = Snapshot::new(0, "aaa0000", vec![SnapshotFile::new("a.md", "line1\nline2\nline3")]);
    s0.magnitude.insert("g".into(), 1.0);
    let mut s1 = Snapshot::new(1, "bbb1111", vec![
        SnapshotFile::new("a.md", "line1\nlineX\nline3\nline4"),
        SnapshotFile::new("b.md", "rust systems"),
    ]);
    s1.magnitude.insert("g".into(), 3.0);
    s1.buckets = 0b10;
    vec![s0, s1]
}

fn config() -> ServerConfig {
    ServerConfig { admin_token: Some("secret".into()), ..ServerConfig::default() }
}

fn indexed_state() -> AppState {
    let state = AppState::new(tiny_corpus(), &config());
    while state.index.write().index_batch(1) {}
    state
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_across_snapshots_newest_first() {
    let app = router(indexed_state());
    let (status, json) = get(app, "/search?q=line3&k=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indexed"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["short"], "bbb1111");
    assert_eq!(arr[1]["short"], "aaa0000");
    assert_eq!(arr[0]["line"], 3);
}

#[tokio::test]
async fn search_single_commit_and_missing_commit() {
    let state = indexed_state();
    let (status, json) = get(router(state.clone()), "/search?q=RUST&commit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["path"], "b.md");
    let (status, _) = get(router(state), "/search?q=rust&commit=9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn diff_is_computed_and_cached() {
    let state = indexed_state();
    let (status, json) = get(router(state.clone()), "/diff?from=0&to=1&path=a.md").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["adds"], 2);
    assert_eq!(json["dels"], 1);
    assert_eq!(json["ops"][0]["kind"], "equal");
    assert!(state.diff_cache.lock().has("0:1:a.md"));

    let (status, json) = get(router(state.clone()), "/diff?from=0&to=1&path=b.md").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["adds"], 1);

    let (status, _) = get(router(state), "/diff?from=0&to=1&path=nope.md").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_timeline_and_corpus() {
    let state = indexed_state();
    let (_, json) = get(router(state.clone()), "/summary?from=0&to=1").await;
    assert_eq!(json["summary"]["modified"][0], "a.md");
    assert_eq!(json["summary"]["added"][0], "b.md");
    assert_eq!(json["movers"][0]["path"], "b.md");

    let (_, json) = get(router(state.clone()), "/timeline?metric=g&bucket=2").await;
    let pts = json.as_array().unwrap();
    assert_eq!(pts[1]["value"], 1.0);
    assert_eq!(pts[0]["matches_filter"], false);
    assert_eq!(pts[1]["matches_filter"], true);

    let (_, json) = get(router(state.clone()), "/corpus/0?path=a.md").await;
    assert_eq!(json["text"], "line1\nline2\nline3");
    assert_eq!(json["stats"]["lines"], 3);

    let (_, json) = get(router(state), "/commits").await;
    assert_eq!(json[1]["file_count"], 2);
}

#[tokio::test]
async fn reset_requires_admin_token() {
    let state = indexed_state();
    let req = Request::post("/index/reset").body(Body::empty()).unwrap();
    let (status, _) = call(router(state.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/index/reset").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(router(state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indexed"], 0);
    assert_eq!(state.index.read().indexed(), 0);
}

#[tokio::test]
async fn background_indexer_covers_corpus() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snaps.json");
    fs::write(&path, serde_json::to_string(&tiny_corpus()).unwrap()).unwrap();
    let (app, state) = build_app(path.to_str().unwrap(), &config()).unwrap();
    let handle = spawn_indexer(state.clone(), 1, Duration::from_millis(1));

    for _ in 0..200 {
        if !state.index.read().has_more() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle.abort();
    assert_eq!(state.index.read().indexed(), 2);

    let (_, json) = get(app, "/search?q=systems").await;
    assert_eq!(json["total_hits"], 1);
}

#[tokio::test]
async fn routes_address_snapshots_by_idx() {
    let corpus = vec![
        Snapshot::new(10, "ten", vec![SnapshotFile::new("a.md", "alpha")]),
        Snapshot::new(20, "twenty", vec![SnapshotFile::new("a.md", "alpha beta")]),
    ];
    let state = AppState::new(corpus, &config());
    while state.index.write().index_batch(1) {}

    let (_, json) = get(router(state.clone()), "/search?q=beta").await;
    let hit_idx = json["results"][0]["snapshot_idx"].as_u64().unwrap();
    assert_eq!(hit_idx, 20);

    let (status, json) = get(router(state.clone()), &format!("/corpus/{hit_idx}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["idx"], 20);
    assert!(json["text"].as_str().unwrap().contains("alpha beta"));

    let (_, json) = get(router(state.clone()), "/commits").await;
    let first = json[0]["idx"].as_u64().unwrap();
    let (status, json) = get(router(state.clone()), &format!("/diff?from={first}&to={hit_idx}&path=a.md")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["adds"], 1);
    assert_eq!(json["dels"], 1);

    let (status, json) = get(router(state.clone()), "/search?q=alpha&commit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["short"], "ten");

    let (_, json) = get(router(state.clone()), "/summary?from=10&to=20").await;
    assert_eq!(json["summary"]["modified"][0], "a.md");

    // list positions are not identifiers
    let (status, _) = get(router(state.clone()), "/corpus/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(router(state), "/diff?from=0&to=1&path=a.md").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
