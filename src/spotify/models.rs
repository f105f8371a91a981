//! Typed views of the Spotify Web API payloads this service consumes.
//!
//! Only the fields the sync engine and views need are modelled. Anything the
//! API may omit or null out is an `Option`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Track URI in the form Spotify expects in playlist mutation bodies.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

/// OAuth token pair owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether the access token is expired or will expire within `buffer`.
    ///
    /// Tokens with unknown expiry are treated as expired.
    pub fn expires_within(&self, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + buffer,
            None => true,
        }
    }
}

/// Response body of `POST /api/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Build credentials, keeping `previous_refresh_token` when Spotify did not
    /// rotate it.
    pub fn into_credentials(
        self,
        previous_refresh_token: Option<&str>,
    ) -> Result<Credentials, String> {
        let refresh_token = match (self.refresh_token, previous_refresh_token) {
            (Some(rotated), _) => rotated,
            (None, Some(previous)) => previous.to_string(),
            (None, None) => return Err("token response missing refresh_token".to_string()),
        };

        Ok(Credentials {
            access_token: self.access_token,
            refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        })
    }
}

/// `GET /v1/me`
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
}

/// Playlist entry of `GET /v1/me/playlists`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner: Owner,
}

/// One page of `GET /v1/me/playlists`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistPage {
    /// Spotify occasionally returns `null` entries inside a page.
    #[serde(default)]
    pub items: Vec<Option<PlaylistSummary>>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub name: String,
}

/// A track object. Local files and unavailable tracks have no id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistTracks {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

/// `GET /v1/playlists/{id}`, also returned by playlist creation.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDetail {
    pub id: String,
    pub name: String,
    pub owner: Owner,
    #[serde(default)]
    pub tracks: PlaylistTracks,
}

impl PlaylistDetail {
    /// Track ids in playlist order, skipping items without a track id.
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks
            .items
            .iter()
            .filter_map(|item| item.track.as_ref())
            .filter_map(|track| track.id.clone())
            .collect()
    }
}

/// `GET /v1/tracks?ids=`
#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    #[serde(default)]
    pub tracks: Vec<Option<Track>>,
}

/// Response of playlist item mutations.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    #[serde(default)]
    pub snapshot_id: Option<String>,
}
