use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::fetcher::{FeedClient, DEFAULT_LIMIT};
use crate::post::{FetchResult, Post};
use crate::viewmodel::FeedViewModel;

pub struct AppState {
    pub client: Arc<FeedClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/posts", get(posts))
        .route("/api/widget", get(widget))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct PostsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Deserialize)]
pub struct WidgetQuery {
    #[serde(default = "default_pages")]
    pub pages: usize,
}

fn default_pages() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct WidgetResponse {
    pub posts: Vec<Post>,
    pub loading: bool,
    pub error: Option<String>,
    pub can_load_more: bool,
    pub displayed_count: usize,
    pub total: usize,
}

pub async fn posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostsQuery>,
) -> Json<FetchResult> {
    let limit = query.limit.min(state.client.settings().fetch_limit);
    Json(state.client.fetch_posts(limit).await)
}

/// Widget state after loading and showing `pages` pages.
pub async fn widget(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WidgetQuery>,
) -> Json<WidgetResponse> {
    let vm = FeedViewModel::new(state.client.clone());
    vm.load_posts().await;

    for _ in 1..query.pages {
        if !vm.can_load_more() {
            break;
        }
        vm.load_more();
    }

    let snapshot = vm.snapshot();
    Json(WidgetResponse {
        posts: snapshot.displayed_posts().to_vec(),
        loading: snapshot.loading,
        can_load_more: snapshot.can_load_more(),
        displayed_count: snapshot.displayed_count,
        total: snapshot.all_posts.len(),
        error: snapshot.error,
    })
}

pub async fn health() -> impl IntoResponse {
    "OK"
}
