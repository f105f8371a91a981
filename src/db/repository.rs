use crate::db::UserStore;
use crate::db::models::{User, UserRow};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Get a user by Spotify user id.
///
/// # Returns
/// Optional User if found, None otherwise
///
/// # Errors
/// Returns error if database query fails
pub async fn get_user(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT * FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

/// Insert or update a user record.
///
/// Uses ON CONFLICT to overwrite every field of an existing record.
/// `created_at` is kept from the first insert.
///
/// # Errors
/// Returns error if database operation fails
pub async fn upsert_user(pool: &PgPool, user: &User) -> Result<User, sqlx::Error> {
    let track_ids: Vec<String> = user.track_ids.iter().cloned().collect();
    let repeat_ids: Vec<String> = user.repeat_ids.iter().cloned().collect();
    let latest_repeat_ids: Vec<String> = user.latest_repeat_ids.iter().cloned().collect();

    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (
            id,
            display_name,
            access_token,
            refresh_token,
            token_expires_at,
            discover_weekly_id,
            dw_dedupe_id,
            track_ids,
            repeat_ids,
            latest_repeat_ids
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id)
        DO UPDATE SET
            display_name = EXCLUDED.display_name,
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            token_expires_at = EXCLUDED.token_expires_at,
            discover_weekly_id = EXCLUDED.discover_weekly_id,
            dw_dedupe_id = EXCLUDED.dw_dedupe_id,
            track_ids = EXCLUDED.track_ids,
            repeat_ids = EXCLUDED.repeat_ids,
            latest_repeat_ids = EXCLUDED.latest_repeat_ids,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&user.id)
    .bind(&user.display_name)
    .bind(&user.credentials.access_token)
    .bind(&user.credentials.refresh_token)
    .bind(user.credentials.expires_at)
    .bind(&user.discover_weekly_id)
    .bind(&user.dw_dedupe_id)
    .bind(&track_ids)
    .bind(&repeat_ids)
    .bind(&latest_repeat_ids)
    .fetch_one(pool)
    .await?;

    Ok(User::from(row))
}

/// List every user, ordered by id.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(get_user(&self.pool, id).await?)
    }

    async fn put(&self, user: &User) -> Result<(), AppError> {
        upsert_user(&self.pool, user).await?;
        tracing::debug!(user_id = %user.id, "Stored user");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(list_users(&self.pool).await?)
    }
}
