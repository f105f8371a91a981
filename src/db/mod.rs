pub mod memory;
pub mod models;
pub mod repository;

use crate::error::AppError;
use async_trait::async_trait;
use models::User;
use sqlx::{PgPool, postgres::PgPoolOptions};

pub use memory::MemoryUserStore;
pub use repository::PgUserStore;

/// Whole-record persistence of users, keyed by Spotify user id.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Insert or replace the stored record.
    async fn put(&self, user: &User) -> Result<(), AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;
}

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    tracing::info!("Initializing database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}
