use crate::db::UserStore;
use crate::db::models::User;
use crate::error::AppError;
use crate::sync::engine::SyncEngine;
use serde::Serialize;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tokio::time::{Instant, timeout_at};

/// Result of syncing one user during a batch run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced {
        user_id: String,
        novel: usize,
        repeats: usize,
    },
    Failed {
        user_id: String,
        error: String,
    },
}

impl SyncOutcome {
    pub fn user_id(&self) -> &str {
        match self {
            SyncOutcome::Synced { user_id, .. } | SyncOutcome::Failed { user_id, .. } => user_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub synced: usize,
    pub failed: usize,
    pub outcomes: Vec<SyncOutcome>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<SyncOutcome>) -> Self {
        let synced = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            synced,
            failed: outcomes.len() - synced,
            outcomes,
        }
    }
}

/// Sync every stored user, one at a time.
///
/// A failure for one user is recorded in the report and the run moves on to
/// the next user. Each user gets at most `per_user_timeout` for refresh and
/// sync combined.
///
/// # Errors
/// Only a failure to list users aborts the run
pub async fn sync_all_users(
    engine: &SyncEngine,
    users: &dyn UserStore,
    per_user_timeout: Duration,
) -> Result<BatchReport, AppError> {
    let all_users = users.list().await?;
    tracing::info!(user_count = all_users.len(), "Starting sync for all users");

    let mut outcomes = Vec::with_capacity(all_users.len());

    for user in all_users {
        let user_id = user.id.clone();
        let deadline = Instant::now() + per_user_timeout;

        let outcome = match sync_user(engine, users, user, deadline).await {
            Ok((novel, repeats)) => SyncOutcome::Synced {
                user_id,
                novel,
                repeats,
            },
            Err(UserSyncError::Failed(e)) => {
                tracing::error!(user_id = %user_id, error = %e, "Sync failed for user");
                SyncOutcome::Failed {
                    user_id,
                    error: e.to_string(),
                }
            }
            Err(UserSyncError::TimedOut) => {
                tracing::error!(
                    user_id = %user_id,
                    timeout_ms = per_user_timeout.as_millis() as u64,
                    "Sync timed out for user"
                );
                SyncOutcome::Failed {
                    user_id,
                    error: format!("timed out after {}ms", per_user_timeout.as_millis()),
                }
            }
        };

        outcomes.push(outcome);
    }

    let report = BatchReport::from_outcomes(outcomes);
    tracing::info!(
        synced = report.synced,
        failed = report.failed,
        "Finished sync for all users"
    );

    Ok(report)
}

enum UserSyncError {
    Failed(AppError),
    TimedOut,
}

impl From<AppError> for UserSyncError {
    fn from(e: AppError) -> Self {
        UserSyncError::Failed(e)
    }
}

impl From<Elapsed> for UserSyncError {
    fn from(_: Elapsed) -> Self {
        UserSyncError::TimedOut
    }
}

/// Refresh, sync and persist one user before `deadline`.
///
/// Refreshed credentials are stored as soon as Spotify returns them, so a
/// rotated refresh token survives a sync that later fails or runs out of time.
async fn sync_user(
    engine: &SyncEngine,
    users: &dyn UserStore,
    mut user: User,
    deadline: Instant,
) -> Result<(usize, usize), UserSyncError> {
    timeout_at(deadline, engine.refresh_credentials(&mut user)).await??;

    if let Err(e) = users.put(&user).await {
        tracing::error!(
            user_id = %user.id,
            error = %e,
            "Failed to persist refreshed credentials"
        );
        return Err(e.into());
    }

    let history_before = user.track_ids.len();
    let synced = timeout_at(deadline, engine.reconcile(user)).await??;
    users.put(&synced).await?;

    // History grows by exactly the novel tracks
    let novel = synced.track_ids.len() - history_before;
    Ok((novel, synced.latest_repeat_ids.len()))
}
