use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Resident set size from `/proc/self/statm`, 0 where unavailable.
fn resident_memory_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| {
            statm
                .split_whitespace()
                .nth(1)
                .and_then(|pages| pages.parse::<u64>().ok())
        })
        .map(|pages| pages * 4096)
        .unwrap_or(0)
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".into())
}

/// `GET /status`: operational snapshot. Renders even when the store is
/// down; connectivity is part of the report.
pub async fn service_status(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let redis_state = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "unavailable",
    };
    let active_sessions = state.store.count_keys("chat_session:*").await.unwrap_or(0);
    let queued_users = state.store.count_keys("user_interests:*").await.unwrap_or(0);

    Ok(Json(json!({
        "service": "matchmaking-service",
        "state": if state.in_maintenance() { "MAINTENANCE" } else { "ACTIVE" },
        "redis": redis_state,
        "activeSessions": active_sessions,
        "queuedUsers": queued_users,
        "localWaiters": state.registry.len().await,
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "memoryBytes": resident_memory_bytes(),
        "host": host_name(),
    })))
}

/// `GET /maintenance`: 200 `ACTIVE` or 503 `MAINTENANCE`.
pub async fn maintenance_status(State(state): State<AppState>) -> Response {
    if state.in_maintenance() {
        (StatusCode::SERVICE_UNAVAILABLE, "MAINTENANCE").into_response()
    } else {
        (StatusCode::OK, "ACTIVE").into_response()
    }
}
