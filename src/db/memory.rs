use crate::db::UserStore;
use crate::db::models::User;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-process user store for development without a database, and for tests.
///
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> AppError {
        AppError::Internal(anyhow::anyhow!("user store lock poisoned"))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.get(id).cloned())
    }

    async fn put(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        let now = Utc::now();

        let mut stored = user.clone();
        stored.created_at = users
            .get(&user.id)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        stored.updated_at = Some(now);

        users.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
