use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, AppState};
use std::sync::Arc;
use tower::ServiceExt;
use wordindex::{ConcurrentInvertedIndex, TaskQueue, ThreadedQueryHandler};

/// Server state over a three-document index; searches default to partial.
fn tiny_state() -> AppState {
    let index = ConcurrentInvertedIndex::new();
    index.add_all(&["rust", "is", "great", "rust", "system"], "doc0.txt", 1);
    index.add_all(&["learn", "rust", "slowli"], "doc1.txt", 1);
    index.add_all(&["rusti", "nail"], "doc2.txt", 1);
    let queue = TaskQueue::new(1);
    let queries = ThreadedQueryHandler::new(Arc::new(index), queue.spawner());
    AppState::new(Arc::new(queries), false)
}

fn tiny_app() -> Router {
    build_app(tiny_state())
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn call_json(uri: &str) -> Value {
    let (status, body) = call(tiny_app(), uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

fn locations(json: &Value) -> Vec<&str> {
    json["results"].as_array().unwrap().iter().map(|r| r["where"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = call(tiny_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn exact_search_returns_ranked_results() {
    let json = call_json("/search?q=Rust&exact=true").await;
    assert_eq!(json["query"], "Rust");
    assert_eq!(json["total_hits"], 2);
    assert_eq!(locations(&json), vec!["doc0.txt", "doc1.txt"]);
    let top = &json["results"][0];
    assert_eq!(top["count"], 2);
    assert_eq!(top["score"].to_string(), "0.40000000");
}

#[tokio::test]
async fn search_defaults_to_partial() {
    let json = call_json("/search?q=rust").await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(locations(&json), vec!["doc2.txt", "doc0.txt", "doc1.txt"]);
}

#[tokio::test]
async fn k_limits_results_but_not_total_hits() {
    let json = call_json("/search?q=rust&k=1").await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(locations(&json), vec!["doc2.txt"]);

    let json = call_json("/search?q=rust&k=0").await;
    assert_eq!(locations(&json).len(), 1);
}

#[tokio::test]
async fn blank_query_has_no_hits() {
    let json = call_json("/search?q=%20%2142").await;
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_query_is_rejected() {
    let (status, _) = call(tiny_app(), "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_report_index_size() {
    let json = call_json("/stats").await;
    assert_eq!(json["words"], 8);
    assert_eq!(json["locations"], 3);
}

#[tokio::test]
async fn searches_in_the_server_mode_share_the_query_cache() {
    let state = tiny_state();
    let (status, _) = call(build_app(state.clone()), "/search?q=Rust!").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.queries.all_queries(), vec!["rust".to_string()]);
    assert_eq!(state.queries.results_for("rust").len(), 3);

    let (_, body) = call(build_app(state.clone()), "/search?q=RUST").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(locations(&json), vec!["doc2.txt", "doc0.txt", "doc1.txt"]);
}

#[tokio::test]
async fn other_mode_bypasses_the_query_cache() {
    let state = tiny_state();
    let (_, body) = call(build_app(state.clone()), "/search?q=rust&exact=true").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(locations(&json), vec!["doc0.txt", "doc1.txt"]);
    assert!(state.queries.all_queries().is_empty());

    let (_, body) = call(build_app(state.clone()), "/search?q=rust").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 3);
}
