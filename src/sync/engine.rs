use crate::config::Config;
use crate::db::models::User;
use crate::error::AppError;
use crate::spotify::client::SpotifyClient;
use crate::spotify::locator::find_playlist;
use crate::spotify::models::PlaylistDetail;
use crate::sync::plan::SyncPlan;
use chrono::Duration;

/// Name of the curator-generated source playlist.
pub const DISCOVER_WEEKLY_NAME: &str = "Discover Weekly";

/// Account that owns every user's Discover Weekly.
pub const CURATOR_ID: &str = "spotify";

pub const DEDUPE_PLAYLIST_NAME: &str = "DW Dedupe";
pub const DEDUPE_PLAYLIST_NAME_DEV: &str = "DW Dedupe - dev";

/// How close to expiry an access token may get before views refresh it.
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Keeps a user's dedupe playlist in step with their Discover Weekly.
#[derive(Clone)]
pub struct SyncEngine {
    spotify: SpotifyClient,
    dedupe_playlist_name: &'static str,
}

impl SyncEngine {
    pub fn new(spotify: SpotifyClient, development: bool) -> Self {
        let dedupe_playlist_name = if development {
            DEDUPE_PLAYLIST_NAME_DEV
        } else {
            DEDUPE_PLAYLIST_NAME
        };

        Self {
            spotify,
            dedupe_playlist_name,
        }
    }

    pub fn from_config(spotify: SpotifyClient, config: &Config) -> Self {
        Self::new(spotify, config.is_development())
    }

    pub fn dedupe_playlist_name(&self) -> &str {
        self.dedupe_playlist_name
    }

    /// Replace the user's credentials with freshly refreshed ones.
    ///
    /// # Errors
    /// `Auth` if Spotify rejects the refresh token
    pub async fn refresh_credentials(&self, user: &mut User) -> Result<(), AppError> {
        user.credentials = self.spotify.refresh(&user.credentials.refresh_token).await?;

        tracing::debug!(user_id = %user.id, "Refreshed user credentials");
        Ok(())
    }

    /// Refresh the user's credentials only if the access token is about to
    /// expire.
    ///
    /// # Returns
    /// Whether the credentials changed and need persisting
    pub async fn ensure_fresh_credentials(&self, user: &mut User) -> Result<bool, AppError> {
        if !user
            .credentials
            .expires_within(Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES))
        {
            return Ok(false);
        }

        tracing::info!(
            user_id = %user.id,
            expires_at = ?user.credentials.expires_at,
            "Access token expired or expiring soon, refreshing"
        );

        self.refresh_credentials(user).await?;
        Ok(true)
    }

    /// Locate the user's Discover Weekly and record its id.
    ///
    /// The id is set once; users that already have one are left alone.
    ///
    /// # Errors
    /// `SourceNotFound` if none of the user's playlists is the curator's
    /// Discover Weekly
    pub async fn resolve_discover_weekly(&self, user: &mut User) -> Result<String, AppError> {
        if let Some(id) = &user.discover_weekly_id {
            return Ok(id.clone());
        }

        let found = find_playlist(
            &self.spotify,
            &user.credentials.access_token,
            |owner| owner == CURATOR_ID,
            |name| name == DISCOVER_WEEKLY_NAME,
        )
        .await?
        .ok_or_else(|| {
            tracing::error!(user_id = %user.id, "No Discover Weekly playlist found");
            AppError::SourceNotFound
        })?;

        tracing::info!(
            user_id = %user.id,
            playlist_id = %found.id,
            "Resolved Discover Weekly playlist"
        );

        user.discover_weekly_id = Some(found.id.clone());
        Ok(found.id)
    }

    /// Run one sync for a user and return the updated record.
    ///
    /// # Flow
    /// 1. Resolve Discover Weekly if the user has none yet
    /// 2. Fetch its tracks and split them into repeats and novel tracks
    /// 3. Resolve the dedupe playlist, relocating or recreating a stale one
    /// 4. Clear the dedupe playlist, then add the novel tracks
    /// 5. Fold this week's tracks into the user's history
    ///
    /// Playlist mutations happen as part of the call. The caller persists the
    /// returned user.
    pub async fn reconcile(&self, mut user: User) -> Result<User, AppError> {
        let source_id = self.resolve_discover_weekly(&mut user).await?;
        let access_token = user.credentials.access_token.clone();

        let discover_weekly = self.spotify.playlist(&access_token, &source_id).await?;
        let plan = SyncPlan::compute(&discover_weekly.track_ids(), &user.track_ids);

        let target = self.resolve_dedupe_playlist(&user).await?;
        user.dw_dedupe_id = Some(target.id.clone());

        let current = target.track_ids();
        self.spotify
            .remove_tracks(&access_token, &target.id, &current)
            .await?;

        if !plan.novel.is_empty() {
            self.spotify
                .add_tracks(&access_token, &target.id, &plan.novel)
                .await?;
        }

        plan.apply_to(&mut user);

        tracing::info!(
            user_id = %user.id,
            dedupe_playlist_id = %target.id,
            discovered = plan.discovered.len(),
            novel = plan.novel.len(),
            repeats = plan.repeats.len(),
            removed = current.len(),
            "Synced dedupe playlist"
        );

        Ok(user)
    }

    /// Fetch the dedupe playlist by its stored id, falling back to a name
    /// search and finally to creating it.
    ///
    /// A failed fetch by id is never propagated.
    async fn resolve_dedupe_playlist(&self, user: &User) -> Result<PlaylistDetail, AppError> {
        let access_token = &user.credentials.access_token;

        if let Some(id) = &user.dw_dedupe_id {
            match self.spotify.playlist(access_token, id).await {
                Ok(playlist) if playlist.owner.id == user.id => return Ok(playlist),
                Ok(playlist) => {
                    tracing::warn!(
                        user_id = %user.id,
                        playlist_id = %id,
                        owner_id = %playlist.owner.id,
                        "Stored dedupe playlist is owned by someone else, relocating"
                    );
                }
                Err(e) if e.is_api_status(404) => {
                    tracing::warn!(
                        user_id = %user.id,
                        playlist_id = %id,
                        "Stored dedupe playlist no longer exists, relocating"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user.id,
                        playlist_id = %id,
                        error = %e,
                        "Failed to fetch stored dedupe playlist, relocating"
                    );
                }
            }
        }

        let existing = find_playlist(
            &self.spotify,
            access_token,
            |owner| owner == user.id,
            |name| name == self.dedupe_playlist_name,
        )
        .await?;

        match existing {
            Some(summary) => {
                tracing::info!(
                    user_id = %user.id,
                    playlist_id = %summary.id,
                    "Reusing existing dedupe playlist"
                );
                self.spotify.playlist(access_token, &summary.id).await
            }
            None => {
                self.spotify
                    .create_playlist(access_token, &user.id, self.dedupe_playlist_name)
                    .await
            }
        }
    }
}
