use anyhow::Result;
use axum::{extract::{Query, State}, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wordindex::query::normalize;
use wordindex::tokenizer::english_stemmer;
use wordindex::{ConcurrentInvertedIndex, SearchIndex, SearchResult, ThreadedQueryHandler};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Defaults to the server's search mode.
    pub exact: Option<bool>,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct Stats {
    pub words: usize,
    pub locations: usize,
}

pub type Queries = ThreadedQueryHandler<ConcurrentInvertedIndex>;

#[derive(Clone)]
pub struct AppState {
    /// Shares its result cache with whoever built the index.
    pub queries: Arc<Queries>,
    /// Search mode whose results are cached.
    pub exact: bool,
}

impl AppState {
    pub fn new(queries: Arc<Queries>, exact: bool) -> Self {
        Self { queries, exact }
    }

    pub fn index(&self) -> &ConcurrentInvertedIndex {
        self.queries.index()
    }

    /// Cached search in the server's own mode; the other mode goes straight
    /// to the index so it never fills the cache with mismatched results.
    fn search(&self, line: &str, exact: bool) -> Vec<SearchResult> {
        if exact == self.exact {
            return self.queries.search_line(line, exact);
        }
        match normalize(line, &english_stemmer()) {
            Some(query) => self.index().search(&query.terms, exact),
            None => Vec::new(),
        }
    }
}

fn cors_layer() -> CorsLayer {
    // CORS_ALLOW_ORIGIN is comma-separated; unset or unparsable means any origin
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = Instant::now();
    let mut results = state.search(&params.q, params.exact.unwrap_or(state.exact));
    let total_hits = results.len();
    results.truncate(params.k.clamp(1, 100));
    Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Stats> {
    let index = state.index().read();
    Json(Stats { words: index.len(), locations: index.counts().len() })
}

/// Serves `state` on `addr` until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}
