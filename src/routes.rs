// HTTP routes for the commit feed.
// Serves /health, /api/commits (one page of the redacted feed) and /api/version.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, header},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::feed::{CommitRecord, FeedReader, PageRequest, ReleaseSource};
use crate::github::HostingApi;
use crate::sync::RefreshTrigger;

/// Shared state behind every route.
pub struct AppState<T, A> {
    pub reader: FeedReader<T>,
    pub releases: ReleaseSource<A>,
}

pub type SharedState<T, A> = Arc<AppState<T, A>>;

/// Build the router. Upstream GitHub failures never reach these handlers;
/// the feed serves whatever the cache holds.
pub fn create_router<T, A>(state: SharedState<T, A>) -> Router
where
    T: RefreshTrigger + 'static,
    A: HostingApi + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/commits", get(get_commits::<T, A>))
        .route("/api/version", get(get_version::<T, A>))
        .with_state(state)
}

/// CORS for the given origins; any origin when the list is empty.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Raw query; unparseable numbers fall back to defaults instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct CommitsQuery {
    page: Option<String>,
    limit: Option<String>,
}

impl CommitsQuery {
    fn page_request(&self) -> PageRequest {
        let parse = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };
        PageRequest::new(parse(&self.page), parse(&self.limit))
    }
}

#[derive(Debug, Serialize)]
pub struct CommitsResponse {
    pub commits: Vec<CommitRecord>,
    pub page: usize,
    pub limit: usize,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

async fn health() -> &'static str {
    "OK"
}

async fn get_commits<T: RefreshTrigger, A: HostingApi>(
    State(state): State<SharedState<T, A>>,
    Query(query): Query<CommitsQuery>,
) -> Json<CommitsResponse> {
    let request = query.page_request();
    let page = state.reader.get_page(request);
    Json(CommitsResponse {
        commits: page.records,
        page: request.page(),
        limit: request.limit(),
        total_count: page.total_count,
    })
}

async fn get_version<T: RefreshTrigger, A: HostingApi>(
    State(state): State<SharedState<T, A>>,
) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.releases.current_version().await,
    })
}
