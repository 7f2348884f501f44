use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// How many interests the popular listing returns.
const POPULAR_TOP_N: usize = 8;

#[derive(Debug, Serialize)]
pub struct PopularInterest {
    pub interest: String,
    pub count: u64,
}

/// `GET /interests/popular`: top tags by enrollments in the last window.
pub async fn popular_interests(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PopularInterest>>> {
    if state.in_maintenance() {
        return Err(AppError::Maintenance);
    }

    let top = state.engine.popular_interests(POPULAR_TOP_N).await?;
    Ok(Json(
        top.into_iter()
            .map(|(interest, count)| PopularInterest { interest, count })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// `POST /cancel_matchmaking`: withdraw from every queue.
pub async fn cancel_matchmaking(
    State(state): State<AppState>,
    Json(body): Json<CancelRequest>,
) -> AppResult<Json<Value>> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidInput("userId is required".into()));
    }

    state.engine.cancel(user_id).await?;
    Ok(Json(json!({ "message": "Search cancelled" })))
}
