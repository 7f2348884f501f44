use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use matchmaking_service::{
    config, error, logging,
    notify::{pubsub, WaiterRegistry},
    routes,
    services::{
        match_engine::MatchEngine, server_selector::ChatServerSelector,
        session_manager::SessionManager,
    },
    state::AppState,
    store::{MatchStore, RedisMatchStore},
};
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    if let Some(url) = &cfg.public_url {
        // Registration with the discovery server happens out of process;
        // the core only advertises what it was given.
        tracing::info!(public_url = %url, "public URL configured");
    }

    tracing::info!(redis_url = %cfg.redis_url, "connecting to store");
    let client = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;
    let manager = ConnectionManager::new(client.clone())
        .await
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;
    let store: Arc<dyn MatchStore> = Arc::new(RedisMatchStore::new(manager));

    let registry = WaiterRegistry::new();
    let sessions = Arc::new(SessionManager::new(store.clone()));
    let selector = Arc::new(ChatServerSelector::new(cfg.discovery_server_url.clone()));
    let engine = Arc::new(MatchEngine::new(
        store.clone(),
        sessions.clone(),
        selector,
        cfg.popular_deny_list.clone(),
    ));

    // Cross-instance match delivery: one dedicated subscriber per process.
    let listener_registry = registry.clone();
    tokio::spawn(async move {
        if let Err(err) = pubsub::start_match_listener(client, listener_registry).await {
            tracing::error!(error = %err, "match notification listener failed");
        }
    });

    let state = AppState {
        engine,
        sessions,
        registry,
        store,
        maintenance: Arc::new(AtomicBool::new(cfg.maintenance_mode)),
        config: cfg.clone(),
        started_at: Instant::now(),
    };

    let app = routes::build_router().with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "matchmaking-service listening");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| error::AppError::StartServer(format!("failed to bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(format!("server error: {e}")))?;

    Ok(())
}
