use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// `GET /session/:user_id`: reconnection lookup. A dangling mapping is
/// repaired by the session manager and reported as no session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Value>> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("userId is required".into()));
    }

    match state.sessions.get_session_for_user(user_id).await? {
        Some(record) => Ok(Json(serde_json::to_value(&record)?)),
        None => Ok(Json(json!({ "message": "No active session for this user" }))),
    }
}

#[derive(Debug, Deserialize)]
pub struct DisconnectRequest {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// `POST /session/disconnect`: explicit end from either participant.
pub async fn disconnect_session(
    State(state): State<AppState>,
    Json(body): Json<DisconnectRequest>,
) -> AppResult<Json<Value>> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("userId is required".into()));
    }

    if state.sessions.end(user_id).await? {
        Ok(Json(json!({ "message": "Session ended" })))
    } else {
        Err(AppError::NotFound)
    }
}
