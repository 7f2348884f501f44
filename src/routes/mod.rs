use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod interests;
pub mod matchmaking;
pub mod sessions;
pub mod status;

use interests::{cancel_matchmaking, popular_interests};
use matchmaking::matchmaking_stream;
use sessions::{disconnect_session, get_session};
use status::{maintenance_status, service_status};

pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/matchmaking", get(matchmaking_stream))
        .route("/session/:user_id", get(get_session))
        .route("/session/disconnect", post(disconnect_session))
        .route("/cancel_matchmaking", post(cancel_matchmaking))
        .route("/interests/popular", get(popular_interests))
        .route("/status", get(service_status))
        .route("/maintenance", get(maintenance_status));

    crate::middleware::with_defaults(router)
}
