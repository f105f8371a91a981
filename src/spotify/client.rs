use crate::config::Config;
use crate::error::AppError;
use crate::spotify::models::{
    Credentials, PlaylistDetail, PlaylistPage, Profile, SnapshotResponse, TokenResponse, Track,
    TracksResponse, track_uri,
};
use crate::spotify::transport::{ApiRequest, ApiResponse, Authorization, Transport};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::sync::Arc;

/// Maximum number of URIs Spotify accepts per playlist add/remove request.
pub const PLAYLIST_MUTATION_BATCH: usize = 100;

/// Maximum number of ids Spotify accepts per `GET /v1/tracks` request.
pub const TRACK_LOOKUP_BATCH: usize = 50;

/// Spotify accounts and Web API client.
///
/// Token endpoint calls authenticate with the application's client
/// credentials; every other call authenticates with a user's access token.
/// Responses are decoded into typed models at this boundary.
#[derive(Clone)]
pub struct SpotifyClient {
    transport: Arc<dyn Transport>,
    accounts_url: String,
    api_url: String,
    redirect_uri: String,
    client_credentials: String,
}

impl SpotifyClient {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let client_credentials = STANDARD.encode(format!(
            "{}:{}",
            config.spotify_client_id, config.spotify_client_secret
        ));

        Self {
            transport,
            accounts_url: config.spotify_accounts_url.trim_end_matches('/').to_string(),
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            redirect_uri: config.callback_url(),
            client_credentials,
        }
    }

    /// Exchange a one-time authorization code for a fresh credential pair.
    ///
    /// # Errors
    /// - `Auth` if Spotify rejects the code
    /// - `Transport` if the request could not be sent
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials, AppError> {
        tracing::info!("Exchanging authorization code for tokens");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        self.request_token(&form, None).await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Spotify may rotate the refresh token. When it does not, the returned
    /// credentials keep `refresh_token`.
    ///
    /// # Errors
    /// - `Auth` if Spotify rejects the refresh token
    /// - `Transport` if the request could not be sent
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credentials, AppError> {
        tracing::debug!("Refreshing Spotify access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let credentials = self.request_token(&form, Some(refresh_token)).await?;

        tracing::debug!(
            refresh_token_rotated = credentials.refresh_token != refresh_token,
            expires_at = ?credentials.expires_at,
            "Received refreshed tokens from Spotify"
        );

        Ok(credentials)
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        previous_refresh_token: Option<&str>,
    ) -> Result<Credentials, AppError> {
        let request = ApiRequest::new(
            Method::POST,
            format!("{}/api/token", self.accounts_url),
            Authorization::Basic(self.client_credentials.clone()),
        )
        .form(form);

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            tracing::error!(
                status = response.status,
                body = %response.body,
                "Token request rejected by Spotify"
            );
            return Err(AppError::Auth(format!(
                "HTTP {}: {}",
                response.status, response.body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| AppError::Auth(format!("Invalid token response: {}", e)))?;

        token
            .into_credentials(previous_refresh_token)
            .map_err(AppError::Auth)
    }

    /// Authenticated `GET` against the Web API.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let request = ApiRequest::new(Method::GET, self.api_url(path), bearer(access_token))
            .query(query);
        self.send_api(request).await
    }

    /// Authenticated `POST` with a JSON body.
    pub async fn post<B, T>(&self, path: &str, access_token: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::POST, self.api_url(path), bearer(access_token))
            .json(to_json(body)?);
        self.send_api(request).await
    }

    /// Authenticated `DELETE` with a JSON body.
    pub async fn delete<B, T>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::DELETE, self.api_url(path), bearer(access_token))
            .json(to_json(body)?);
        self.send_api(request).await
    }

    pub async fn current_user(&self, access_token: &str) -> Result<Profile, AppError> {
        self.get("/v1/me", access_token, &[]).await
    }

    pub async fn user_playlists(
        &self,
        access_token: &str,
        limit: usize,
        offset: usize,
    ) -> Result<PlaylistPage, AppError> {
        self.get(
            "/v1/me/playlists",
            access_token,
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetail, AppError> {
        self.get(&format!("/v1/playlists/{}", playlist_id), access_token, &[])
            .await
    }

    /// Create a private playlist owned by `user_id`.
    pub async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<PlaylistDetail, AppError> {
        tracing::info!(user_id = user_id, name = name, "Creating playlist");

        self.post(
            &format!("/v1/users/{}/playlists", user_id),
            access_token,
            &json!({ "name": name, "public": false }),
        )
        .await
    }

    /// Append tracks to a playlist, in order. No request is made for an empty list.
    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), AppError> {
        let path = format!("/v1/playlists/{}/tracks", playlist_id);

        for chunk in track_ids.chunks(PLAYLIST_MUTATION_BATCH) {
            let uris: Vec<String> = chunk.iter().map(|id| track_uri(id)).collect();
            let _: SnapshotResponse = self
                .post(&path, access_token, &json!({ "uris": uris }))
                .await?;
        }

        Ok(())
    }

    /// Remove every occurrence of the given tracks from a playlist. No request
    /// is made for an empty list.
    pub async fn remove_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), AppError> {
        let path = format!("/v1/playlists/{}/tracks", playlist_id);

        for chunk in track_ids.chunks(PLAYLIST_MUTATION_BATCH) {
            let tracks: Vec<serde_json::Value> = chunk
                .iter()
                .map(|id| json!({ "uri": track_uri(id) }))
                .collect();
            let _: SnapshotResponse = self
                .delete(&path, access_token, &json!({ "tracks": tracks }))
                .await?;
        }

        Ok(())
    }

    /// Look up full track objects. Unknown ids are dropped from the result.
    pub async fn tracks(
        &self,
        access_token: &str,
        track_ids: &[String],
    ) -> Result<Vec<Track>, AppError> {
        let mut tracks = Vec::with_capacity(track_ids.len());

        for chunk in track_ids.chunks(TRACK_LOOKUP_BATCH) {
            let response: TracksResponse = self
                .get("/v1/tracks", access_token, &[("ids", chunk.join(","))])
                .await?;
            tracks.extend(response.tracks.into_iter().flatten());
        }

        Ok(tracks)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send_api<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, AppError> {
        let method = request.method.clone();
        let url = request.url.clone();

        let response = self.transport.send(request).await?;
        let ApiResponse { status, body } = response;

        if !(200..300).contains(&status) {
            tracing::debug!(
                method = %method,
                url = %url,
                status = status,
                "Spotify API returned an error status"
            );
            return Err(AppError::Api { status, body });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(method = %method, url = %url, error = %e, "Failed to decode Spotify response");
            AppError::Decode(format!("{} {}: {}", method, url, e))
        })
    }
}

fn bearer(access_token: &str) -> Authorization {
    Authorization::Bearer(access_token.to_string())
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode request body: {}", e)))
}
