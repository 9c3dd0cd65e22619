use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::fetcher::FeedClient;
use crate::post::{FetchResult, Post};

/// Pagination state for a "latest posts" widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub all_posts: Vec<Post>,
    pub displayed_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub all_posts_loaded: bool,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            all_posts: Vec::new(),
            displayed_count: page_size,
            loading: false,
            error: None,
            all_posts_loaded: false,
        }
    }

    pub fn displayed_posts(&self) -> &[Post] {
        let end = self.displayed_count.min(self.all_posts.len());
        &self.all_posts[..end]
    }

    pub fn can_load_more(&self) -> bool {
        !self.all_posts_loaded && self.displayed_count < self.all_posts.len()
    }
}

/// Wraps a [`FeedClient`] with incremental "load more" state.
///
/// State lives in a watch channel: every change is pushed to receivers from
/// [`FeedViewModel::subscribe`]. Overlapping `load_posts` calls are not
/// coordinated; whichever fetch resolves last writes the final state.
pub struct FeedViewModel {
    client: Arc<FeedClient>,
    page_size: usize,
    fetch_limit: usize,
    state: watch::Sender<ViewState>,
}

impl FeedViewModel {
    /// Page size and fetch limit come from the client's settings.
    pub fn new(client: Arc<FeedClient>) -> Self {
        let page_size = client.settings().page_size;
        let fetch_limit = client.settings().fetch_limit;
        Self::with_paging(client, page_size, fetch_limit)
    }

    pub fn with_paging(client: Arc<FeedClient>, page_size: usize, fetch_limit: usize) -> Self {
        let page_size = page_size.max(1);
        let (state, _) = watch::channel(ViewState::new(page_size));

        Self {
            client,
            page_size,
            fetch_limit,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn displayed_posts(&self) -> Vec<Post> {
        self.state.borrow().displayed_posts().to_vec()
    }

    pub fn can_load_more(&self) -> bool {
        self.state.borrow().can_load_more()
    }

    pub async fn load_posts(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.client.fetch_posts(self.fetch_limit).await;

        self.state.send_modify(|s| {
            match result {
                FetchResult::Success { posts, .. } => {
                    debug!("Loaded {} posts into view", posts.len());
                    s.all_posts = posts;
                    s.all_posts_loaded = s.all_posts.len() <= s.displayed_count;
                }
                FetchResult::Failure { error } => {
                    s.error = Some(error);
                }
            }
            s.loading = false;
        });
    }

    /// Show one more page. Does nothing (and notifies no one) when everything
    /// is already displayed.
    pub fn load_more(&self) {
        let page_size = self.page_size;
        self.state.send_if_modified(|s| {
            if !s.can_load_more() {
                return false;
            }
            s.displayed_count += page_size;
            if s.displayed_count >= s.all_posts.len() {
                s.all_posts_loaded = true;
            }
            true
        });
    }
}
