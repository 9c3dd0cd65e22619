use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use substack_feed::config::Config;
use substack_feed::db::Database;
use substack_feed::fetcher::FeedClient;
use substack_feed::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "substack_feed=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("FEED_CONFIG").unwrap_or_else(|_| "feed.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    // Initialize cache database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:feed_cache.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Cache database initialized");
    match db.updated_at(&config.feed.cache_key).await? {
        Some(at) => info!("Feed cache last written at {}", at),
        None => info!("Feed cache is empty"),
    }

    let client = Arc::new(FeedClient::new(config.feed.clone(), Arc::new(db))?);
    let state = Arc::new(AppState { client });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!("Server starting on http://{}", config.listen);

    axum::serve(listener, app).await?;

    Ok(())
}
