mod billing;
mod cache;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod sessions;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::billing::{CreditLedger, PgCreditLedger};
use crate::cache::{MemoryCache, RedisCache, ResultCache};
use crate::config::{CacheBackend, Config};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::gateway::{GatewayOptions, ScoringGateway};
use crate::scoring::scorer::GeminiScorer;
use crate::sessions::{PgSessionStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (credit ledger + session history)
    let db = create_pool(&config.database_url).await?;
    let ledger: Arc<dyn CreditLedger> = Arc::new(PgCreditLedger::new(db.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(db.clone()));

    // Initialize score cache
    let cache = build_cache(&config)?;
    info!(
        "Score cache initialized (backend: {}, enabled: {}, ttl: {}s)",
        cache.backend(),
        config.cache_enabled,
        config.cache_ttl.as_secs()
    );

    // Initialize LLM client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.scorer_timeout,
        config.scorer_max_retries,
    );
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let gateway = ScoringGateway::new(
        Arc::new(GeminiScorer(llm)),
        cache,
        ledger.clone(),
        sessions.clone(),
        GatewayOptions::from_config(&config),
    );
    info!("Scoring gateway ready (billing enabled: {})", config.billing_enabled);

    // Build app state
    let state = AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        ledger,
        sessions,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing PostgreSQL pool");
    db.close().await;

    Ok(())
}

/// Picks the cache backend named by `CACHE_BACKEND`.
fn build_cache(config: &Config) -> Result<Arc<dyn ResultCache>> {
    let cache: Arc<dyn ResultCache> = match (config.cache_backend, config.redis_url.as_deref()) {
        (CacheBackend::Redis, Some(url)) => Arc::new(RedisCache::new(url)?),
        (CacheBackend::Redis, None) => anyhow::bail!("CACHE_BACKEND=redis requires REDIS_URL"),
        (CacheBackend::Memory, _) => {
            Arc::new(MemoryCache::with_sweeper(config.cache_sweep_interval))
        }
    };
    Ok(cache)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
