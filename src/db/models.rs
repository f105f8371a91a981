use crate::spotify::models::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

/// A signed-up Spotify user and their sync history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub credentials: Credentials,
    /// Set once, on first sync
    pub discover_weekly_id: Option<String>,
    /// May point at a playlist deleted since; re-resolved on the next sync
    pub dw_dedupe_id: Option<String>,
    /// Every track ever surfaced by Discover Weekly
    pub track_ids: BTreeSet<String>,
    /// Every repeat ever detected
    pub repeat_ids: BTreeSet<String>,
    /// Repeats detected by the most recent sync
    pub latest_repeat_ids: BTreeSet<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: String, display_name: Option<String>, credentials: Credentials) -> Self {
        Self {
            id,
            display_name,
            credentials,
            discover_weekly_id: None,
            dw_dedupe_id: None,
            track_ids: BTreeSet::new(),
            repeat_ids: BTreeSet::new(),
            latest_repeat_ids: BTreeSet::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub display_name: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub discover_weekly_id: Option<String>,
    pub dw_dedupe_id: Option<String>,
    pub track_ids: Vec<String>,
    pub repeat_ids: Vec<String>,
    pub latest_repeat_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            credentials: Credentials {
                access_token: row.access_token,
                refresh_token: row.refresh_token,
                expires_at: row.token_expires_at,
            },
            discover_weekly_id: row.discover_weekly_id,
            dw_dedupe_id: row.dw_dedupe_id,
            track_ids: row.track_ids.into_iter().collect(),
            repeat_ids: row.repeat_ids.into_iter().collect(),
            latest_repeat_ids: row.latest_repeat_ids.into_iter().collect(),
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}
