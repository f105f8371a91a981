//! Shared helpers for integration tests.
//!
//! `FakeSpotify` is an in-memory stand-in for the Spotify accounts service and
//! Web API, plugged in through the `Transport` seam. Every request it receives
//! is recorded so tests can assert on call order and credentials.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dw_dedupe::config::Config;
use dw_dedupe::db::models::User;
use dw_dedupe::error::AppError;
use dw_dedupe::spotify::SpotifyClient;
use dw_dedupe::spotify::models::Credentials;
use dw_dedupe::spotify::transport::{
    ApiRequest, ApiResponse, Authorization, RequestBody, Transport,
};
use dw_dedupe::sync::SyncEngine;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const DEV_PLAYLIST_NAME: &str = "DW Dedupe - dev";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Authorization,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RecordedRequest {
    pub fn is(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.path == path
    }
}

#[derive(Debug, Clone)]
struct FakePlaylist {
    id: String,
    name: String,
    owner: String,
    tracks: Vec<String>,
}

#[derive(Debug, Clone)]
struct FakeAccount {
    display_name: Option<String>,
    refresh_token: String,
    rotate_refresh_token: bool,
    revoked: bool,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, FakeAccount>,
    codes: HashMap<String, String>,
    playlists: HashMap<String, FakePlaylist>,
    /// Playlist ids per user, in listing order
    libraries: HashMap<String, Vec<String>>,
    unavailable_tracks: HashSet<String>,
    failures: Vec<(Method, String, u16)>,
    requests: Vec<RecordedRequest>,
    next_playlist: usize,
    next_token: usize,
}

#[derive(Default)]
pub struct FakeSpotify {
    state: Mutex<FakeState>,
}

impl FakeSpotify {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Register a Spotify account. Its refresh token is `refresh-<id>`.
    pub fn add_user(&self, user_id: &str, display_name: &str) {
        let mut state = self.state();
        state.accounts.insert(
            user_id.to_string(),
            FakeAccount {
                display_name: Some(display_name.to_string()),
                refresh_token: format!("refresh-{}", user_id),
                rotate_refresh_token: false,
                revoked: false,
            },
        );
        state.libraries.entry(user_id.to_string()).or_default();
    }

    /// Make `code` a valid authorization code for `user_id`.
    pub fn issue_code(&self, code: &str, user_id: &str) {
        self.state()
            .codes
            .insert(code.to_string(), user_id.to_string());
    }

    pub fn rotate_refresh_tokens(&self, user_id: &str) {
        if let Some(account) = self.state().accounts.get_mut(user_id) {
            account.rotate_refresh_token = true;
        }
    }

    pub fn revoke(&self, user_id: &str) {
        if let Some(account) = self.state().accounts.get_mut(user_id) {
            account.revoked = true;
        }
    }

    pub fn refresh_token_of(&self, user_id: &str) -> String {
        self.state().accounts[user_id].refresh_token.clone()
    }

    /// Credentials as if `user_id` had just signed in.
    pub fn credentials(&self, user_id: &str) -> Credentials {
        Credentials {
            access_token: format!("access-{}-0", user_id),
            refresh_token: self.refresh_token_of(user_id),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }

    /// Add a playlist to the end of `library_of`'s playlist listing.
    pub fn add_playlist(&self, library_of: &str, id: &str, name: &str, owner: &str, tracks: &[&str]) {
        let mut state = self.state();
        state.playlists.insert(
            id.to_string(),
            FakePlaylist {
                id: id.to_string(),
                name: name.to_string(),
                owner: owner.to_string(),
                tracks: tracks.iter().map(|t| t.to_string()).collect(),
            },
        );
        state
            .libraries
            .entry(library_of.to_string())
            .or_default()
            .push(id.to_string());
    }

    pub fn add_discover_weekly(&self, user_id: &str, id: &str, tracks: &[&str]) {
        self.add_playlist(user_id, id, "Discover Weekly", "spotify", tracks);
    }

    pub fn set_tracks(&self, playlist_id: &str, tracks: &[&str]) {
        if let Some(playlist) = self.state().playlists.get_mut(playlist_id) {
            playlist.tracks = tracks.iter().map(|t| t.to_string()).collect();
        }
    }

    /// Delete a playlist everywhere, as if its owner removed it.
    pub fn delete_playlist(&self, playlist_id: &str) {
        let mut state = self.state();
        state.playlists.remove(playlist_id);
        for library in state.libraries.values_mut() {
            library.retain(|id| id != playlist_id);
        }
    }

    pub fn playlist_tracks(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.state()
            .playlists
            .get(playlist_id)
            .map(|p| p.tracks.clone())
    }

    /// Ids of the playlists in `user_id`'s listing owned by them and named `name`.
    pub fn owned_playlists_named(&self, user_id: &str, name: &str) -> Vec<String> {
        let state = self.state();
        state
            .libraries
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.playlists.get(id))
            .filter(|p| p.owner == user_id && p.name == name)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn mark_unavailable(&self, track_id: &str) {
        self.state().unavailable_tracks.insert(track_id.to_string());
    }

    /// Answer every `method path` request with `status` from now on.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.state().failures.push((method, path.to_string(), status));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.is(&method, path))
            .count()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: body.to_string(),
    }
}

fn not_found() -> ApiResponse {
    respond(404, json!({ "error": { "status": 404, "message": "Not found." } }))
}

fn playlist_json(playlist: &FakePlaylist) -> Value {
    let items: Vec<Value> = playlist
        .tracks
        .iter()
        .map(|id| json!({ "track": { "id": id, "name": format!("Track {}", id) } }))
        .collect();

    json!({
        "id": playlist.id,
        "name": playlist.name,
        "owner": { "id": playlist.owner },
        "tracks": { "items": items },
    })
}

fn form_value<'a>(body: &'a RequestBody, key: &str) -> Option<&'a str> {
    match body {
        RequestBody::Form(form) => form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str()),
        _ => None,
    }
}

fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn uri_ids(values: impl Iterator<Item = String>) -> Vec<String> {
    values
        .map(|uri| uri.trim_start_matches("spotify:track:").to_string())
        .collect()
}

impl FakeState {
    fn issue_access_token(&mut self, user_id: &str) -> String {
        self.next_token += 1;
        format!("access-{}-{}", user_id, self.next_token)
    }

    fn bearer_user(&self, authorization: &Authorization) -> Option<String> {
        let Authorization::Bearer(token) = authorization else {
            return None;
        };
        let (user_id, _) = token.strip_prefix("access-")?.rsplit_once('-')?;
        self.accounts.contains_key(user_id).then(|| user_id.to_string())
    }

    fn token(&mut self, request: &ApiRequest) -> ApiResponse {
        if !matches!(request.authorization, Authorization::Basic(_)) {
            return respond(400, json!({ "error": "invalid_client" }));
        }

        match form_value(&request.body, "grant_type") {
            Some("authorization_code") => {
                let user_id = form_value(&request.body, "code")
                    .and_then(|code| self.codes.get(code))
                    .cloned();
                let Some(user_id) = user_id else {
                    return respond(400, json!({ "error": "invalid_grant" }));
                };

                let access_token = self.issue_access_token(&user_id);
                respond(
                    200,
                    json!({
                        "access_token": access_token,
                        "token_type": "Bearer",
                        "expires_in": 3600,
                        "refresh_token": self.accounts[&user_id].refresh_token,
                    }),
                )
            }
            Some("refresh_token") => {
                let presented = form_value(&request.body, "refresh_token").unwrap_or_default();
                let found = self
                    .accounts
                    .iter()
                    .find(|(_, a)| a.refresh_token == presented && !a.revoked)
                    .map(|(id, a)| (id.clone(), a.rotate_refresh_token));
                let Some((user_id, rotate)) = found else {
                    return respond(400, json!({ "error": "invalid_grant" }));
                };

                let access_token = self.issue_access_token(&user_id);
                let mut body = json!({
                    "access_token": access_token,
                    "token_type": "Bearer",
                    "expires_in": 3600,
                });

                if rotate {
                    let rotated = format!("{}-r{}", presented, self.next_token);
                    if let Some(account) = self.accounts.get_mut(&user_id) {
                        account.refresh_token = rotated.clone();
                    }
                    body["refresh_token"] = json!(rotated);
                }

                respond(200, body)
            }
            _ => respond(400, json!({ "error": "unsupported_grant_type" })),
        }
    }

    fn api(&mut self, request: &ApiRequest, path: &str) -> ApiResponse {
        let Some(user_id) = self.bearer_user(&request.authorization) else {
            return respond(401, json!({ "error": { "status": 401, "message": "Invalid access token" } }));
        };

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["v1", "me"]) => respond(
                200,
                json!({
                    "id": user_id,
                    "display_name": self.accounts[&user_id].display_name,
                }),
            ),
            ("GET", ["v1", "me", "playlists"]) => {
                let limit: usize = query_value(&request.query, "limit")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20);
                let offset: usize = query_value(&request.query, "offset")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);

                let library = self.libraries.get(&user_id).cloned().unwrap_or_default();
                let items: Vec<Value> = library
                    .iter()
                    .skip(offset)
                    .take(limit)
                    .filter_map(|id| self.playlists.get(id))
                    .map(|p| json!({ "id": p.id, "name": p.name, "owner": { "id": p.owner } }))
                    .collect();

                respond(200, json!({ "items": items, "total": library.len() }))
            }
            ("GET", ["v1", "playlists", id]) => match self.playlists.get(*id) {
                Some(playlist) => respond(200, playlist_json(playlist)),
                None => not_found(),
            },
            ("POST", ["v1", "users", owner, "playlists"]) => {
                if *owner != user_id {
                    return respond(403, json!({ "error": { "status": 403, "message": "Forbidden" } }));
                }
                let name = match &request.body {
                    RequestBody::Json(body) => body["name"].as_str().unwrap_or_default().to_string(),
                    _ => String::new(),
                };

                self.next_playlist += 1;
                let playlist = FakePlaylist {
                    id: format!("created-{}", self.next_playlist),
                    name,
                    owner: user_id.clone(),
                    tracks: Vec::new(),
                };
                let body = playlist_json(&playlist);

                self.libraries
                    .entry(user_id)
                    .or_default()
                    .push(playlist.id.clone());
                self.playlists.insert(playlist.id.clone(), playlist);

                respond(201, body)
            }
            (method @ ("POST" | "DELETE"), ["v1", "playlists", id, "tracks"]) => {
                let Some(playlist) = self.playlists.get_mut(*id) else {
                    return not_found();
                };
                if playlist.owner != user_id {
                    return respond(403, json!({ "error": { "status": 403, "message": "Forbidden" } }));
                }
                let RequestBody::Json(body) = &request.body else {
                    return respond(400, json!({ "error": { "status": 400, "message": "Missing body" } }));
                };

                if method == "POST" {
                    let uris = body["uris"]
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_string));
                    playlist.tracks.extend(uri_ids(uris));
                } else {
                    let uris = body["tracks"]
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|v| v["uri"].as_str().map(str::to_string));
                    let removed: HashSet<String> = uri_ids(uris).into_iter().collect();
                    playlist.tracks.retain(|t| !removed.contains(t));
                }

                respond(200, json!({ "snapshot_id": "snapshot" }))
            }
            ("GET", ["v1", "tracks"]) => {
                let tracks: Vec<Value> = query_value(&request.query, "ids")
                    .unwrap_or_default()
                    .split(',')
                    .filter(|id| !id.is_empty())
                    .map(|id| {
                        if self.unavailable_tracks.contains(id) {
                            Value::Null
                        } else {
                            json!({
                                "id": id,
                                "name": format!("Track {}", id),
                                "artists": [{ "name": "Artist" }],
                                "album": { "name": "Album" },
                            })
                        }
                    })
                    .collect();

                respond(200, json!({ "tracks": tracks }))
            }
            _ => not_found(),
        }
    }
}

#[async_trait]
impl Transport for FakeSpotify {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        let config = test_config();
        let mut state = self.state();

        let (is_token, path) = if let Some(path) = request.url.strip_prefix(&config.spotify_accounts_url) {
            (true, path.to_string())
        } else if let Some(path) = request.url.strip_prefix(&config.spotify_api_url) {
            (false, path.to_string())
        } else {
            return Err(AppError::Transport(format!("unknown host in {}", request.url)));
        };

        state.requests.push(RecordedRequest {
            method: request.method.clone(),
            path: path.clone(),
            authorization: request.authorization.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
        });

        let injected = state
            .failures
            .iter()
            .find(|(method, failing, _)| *method == request.method && *failing == path)
            .map(|(_, _, status)| *status);
        if let Some(status) = injected {
            return Ok(respond(status, json!({ "error": { "status": status, "message": "Injected failure" } })));
        }

        if is_token {
            if path == "/api/token" && request.method == Method::POST {
                return Ok(state.token(&request));
            }
            return Ok(not_found());
        }

        Ok(state.api(&request, &path))
    }
}

/// Development configuration pointed at the fake's hosts.
pub fn test_config() -> Config {
    Config::default()
}

pub fn spotify_client(fake: &Arc<FakeSpotify>) -> SpotifyClient {
    SpotifyClient::new(fake.clone(), &test_config())
}

pub fn sync_engine(fake: &Arc<FakeSpotify>) -> SyncEngine {
    SyncEngine::from_config(spotify_client(fake), &test_config())
}

/// A stored user with fresh credentials and no sync history.
pub fn signed_up_user(fake: &FakeSpotify, user_id: &str) -> User {
    User::new(
        user_id.to_string(),
        Some(user_id.to_string()),
        fake.credentials(user_id),
    )
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
