use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application-specific errors with HTTP status code mappings
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Spotify authorization failed: {0}")]
    Auth(String),

    #[error("Spotify API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Spotify request failed: {0}")]
    Transport(String),

    #[error("Unexpected Spotify response: {0}")]
    Decode(String),

    #[error("No Discover Weekly playlist found")]
    SourceNotFound,

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Not signed in")]
    Unauthorized,

    #[error("A sync job is already running")]
    BatchInProgress,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the provider answered with the given HTTP status.
    pub fn is_api_status(&self, expected: u16) -> bool {
        matches!(self, AppError::Api { status, .. } if *status == expected)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Unauthorized => {
                tracing::debug!("No signed-in session, redirecting to login");
                return Redirect::to("/login").into_response();
            }
            AppError::Auth(msg) => {
                tracing::warn!("Spotify authorization error: {}", msg);
                (StatusCode::UNAUTHORIZED, "Spotify authorization error")
            }
            AppError::StateMismatch => {
                tracing::warn!("OAuth state mismatch");
                (StatusCode::BAD_REQUEST, "States don't match")
            }
            AppError::Api { status, body } => {
                tracing::error!(status = status, body = %body, "Spotify API error");
                (StatusCode::BAD_GATEWAY, "Spotify API error")
            }
            AppError::Transport(msg) => {
                tracing::error!("Spotify request failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "Spotify API unreachable")
            }
            AppError::Decode(msg) => {
                tracing::error!("Unexpected Spotify response: {}", msg);
                (StatusCode::BAD_GATEWAY, "Unexpected Spotify response")
            }
            AppError::SourceNotFound => {
                tracing::error!("No Discover Weekly playlist found");
                (
                    StatusCode::NOT_FOUND,
                    "No Discover Weekly playlist found, follow it in Spotify and try again",
                )
            }
            AppError::BatchInProgress => {
                tracing::warn!("Sync job already running");
                (StatusCode::CONFLICT, "A sync job is already running")
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.as_str())
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}
