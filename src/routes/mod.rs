pub mod auth;
pub mod jobs;
pub mod library;

use crate::AppState;
use crate::config::{AUTHORIZE_CALLBACK_PATH, AUTHORIZE_REDIRECT_PATH};
use axum::{Json, Router, routing::get};
use serde_json::json;
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", get(auth::login))
        .route("/logout", get(auth::logout))
        .route(AUTHORIZE_REDIRECT_PATH, get(auth::authorize_redirect))
        .route(AUTHORIZE_CALLBACK_PATH, get(auth::authorize_callback))
        .route("/", get(library::summary))
        .route("/history", get(library::history))
        .route("/latest", get(library::latest))
        .route("/jobs/update", get(jobs::update))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
