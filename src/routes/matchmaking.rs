use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

use crate::models::interest;
use crate::notify::events::MatchEvent;
use crate::notify::WaiterRegistry;
use crate::services::match_engine::{MatchEngine, MatchOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchmakingParams {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub interest: Option<String>,
}

/// Releases a waiter's registration and queue state when its stream goes
/// away, whatever the cause. Cleanup is skipped when the registration was
/// already replaced by a newer stream for the same user.
struct StreamGuard {
    registry: WaiterRegistry,
    engine: Arc<MatchEngine>,
    user_id: String,
    token: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let engine = self.engine.clone();
        let user_id = std::mem::take(&mut self.user_id);
        let token = self.token;
        tokio::spawn(async move {
            if registry.release(&user_id, token).await {
                if let Err(err) = engine.cancel(&user_id).await {
                    warn!(user_id = %user_id, error = %err, "cleanup after stream close failed");
                }
            }
        });
    }
}

fn sse_frame(event: &MatchEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".into());
    Ok(Event::default().data(data))
}

/// A stream that emits exactly one frame and ends.
fn single_frame(status: StatusCode, event: &MatchEvent) -> Response {
    let sse = Sse::new(stream::iter([sse_frame(event)]));
    (status, sse).into_response()
}

/// `GET /matchmaking?userId=<id>&interest=<csv>`
///
/// Pairs the caller synchronously when a partner is already waiting;
/// otherwise enrolls them and holds the stream open until the bus delivers
/// a `MATCHED` payload. The waiter channel is registered before the engine
/// runs so a publish landing right after enqueue cannot be lost.
pub async fn matchmaking_stream(
    State(state): State<AppState>,
    Query(params): Query<MatchmakingParams>,
) -> Response {
    if state.in_maintenance() {
        return single_frame(
            StatusCode::SERVICE_UNAVAILABLE,
            &MatchEvent::Maintenance {
                message: "Matchmaking is temporarily offline for maintenance".into(),
            },
        );
    }

    let user_id = params.user_id.trim().to_string();
    if user_id.is_empty() {
        return single_frame(
            StatusCode::BAD_REQUEST,
            &MatchEvent::Error {
                message: "userId query parameter is required".into(),
            },
        );
    }

    let interests = params
        .interest
        .as_deref()
        .map(interest::parse_csv)
        .unwrap_or_default();

    let (token, rx) = state.registry.register(&user_id).await;

    match state.engine.find_or_queue(&user_id, &interests).await {
        Ok(MatchOutcome::Matched(result)) => {
            state.registry.release(&user_id, token).await;
            single_frame(StatusCode::OK, &MatchEvent::from_result(&result))
        }
        Ok(MatchOutcome::Waiting) => {
            let guard = StreamGuard {
                registry: state.registry.clone(),
                engine: state.engine.clone(),
                user_id,
                token,
            };

            let head = stream::iter([sse_frame(&MatchEvent::Waiting)]);
            let tail = UnboundedReceiverStream::new(rx)
                .take(1)
                .map(|payload| Ok::<Event, Infallible>(Event::default().data(payload)));
            let frames = head.chain(tail).map(move |frame| {
                let _open = &guard;
                frame
            });

            Sse::new(frames)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(err) => {
            state.registry.release(&user_id, token).await;
            warn!(user_id = %user_id, error = %err, "matchmaking search failed");
            single_frame(
                err.status_code(),
                &MatchEvent::Error {
                    message: err.to_string(),
                },
            )
        }
    }
}
