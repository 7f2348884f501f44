use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("discovery unavailable: {0}")]
    Discovery(String),

    #[error("service in maintenance mode")]
    Maintenance,

    #[error("not found")]
    NotFound,

    #[error("inconsistent store state: {0}")]
    Inconsistent(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Maintenance | AppError::Discovery(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_)
            | AppError::Inconsistent(_)
            | AppError::Serialization(_)
            | AppError::Config(_)
            | AppError::StartServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "state": "ERROR",
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
