use crate::AppState;
use crate::error::AppError;
use crate::sync::{BatchReport, sync_all_users};
use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Duration;

/// Sync every stored user
///
/// # Endpoint
/// GET /jobs/update
///
/// # Returns
/// Per-user outcomes of the run
///
/// # Errors
/// 409 if another run is still in progress
pub async fn update(State(state): State<Arc<AppState>>) -> Result<Json<BatchReport>, AppError> {
    let _guard = state
        .batch_lock
        .try_lock()
        .map_err(|_| AppError::BatchInProgress)?;

    let report = sync_all_users(
        &state.engine,
        state.users.as_ref(),
        Duration::from_secs(state.config.sync_timeout_secs),
    )
    .await?;

    tracing::info!(
        synced = report.synced,
        failed = report.failed,
        "Sync job finished"
    );

    Ok(Json(report))
}
