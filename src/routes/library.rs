use crate::AppState;
use crate::db::models::User;
use crate::error::AppError;
use crate::session::SessionState;
use crate::spotify::models::Track;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub discover_weekly_id: Option<String>,
    pub dw_dedupe_id: Option<String>,
    pub dedupe_playlist_name: String,
    pub track_count: usize,
    pub repeat_count: usize,
    pub latest_repeat_count: usize,
}

impl UserSummary {
    fn new(user: &User, dedupe_playlist_name: &str) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            discover_weekly_id: user.discover_weekly_id.clone(),
            dw_dedupe_id: user.dw_dedupe_id.clone(),
            dedupe_playlist_name: dedupe_playlist_name.to_string(),
            track_count: user.track_ids.len(),
            repeat_count: user.repeat_ids.len(),
            latest_repeat_count: user.latest_repeat_ids.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackList {
    pub tracks: Vec<Track>,
}

/// Load the signed-in user with usable credentials.
///
/// # Returns
/// `None` if the session names a user that is no longer stored
///
/// # Errors
/// `Unauthorized` if nobody is signed in
async fn signed_in_user(state: &AppState, jar: &CookieJar) -> Result<Option<User>, AppError> {
    let session = state.sessions.load(jar);
    let user_id = session.user_id().ok_or(AppError::Unauthorized)?;

    let Some(mut user) = state.users.get(user_id).await? else {
        tracing::warn!(user_id = %user_id, "Session refers to an unknown user");
        return Ok(None);
    };

    if state.engine.ensure_fresh_credentials(&mut user).await? {
        state.users.put(&user).await?;
    }

    Ok(Some(user))
}

fn sign_out(state: &AppState, jar: CookieJar) -> Response {
    let jar = state.sessions.store(jar, &SessionState::Anonymous);
    (jar, Redirect::to("/login")).into_response()
}

/// GET /
pub async fn summary(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = signed_in_user(&state, &jar).await? else {
        return Ok(sign_out(&state, jar));
    };

    Ok(Json(UserSummary::new(&user, state.engine.dedupe_playlist_name())).into_response())
}

/// Every track Discover Weekly has ever surfaced for the user
///
/// # Endpoint
/// GET /history
pub async fn history(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = signed_in_user(&state, &jar).await? else {
        return Ok(sign_out(&state, jar));
    };

    let ids: Vec<String> = user.track_ids.iter().cloned().collect();
    let tracks = state
        .spotify
        .tracks(&user.credentials.access_token, &ids)
        .await?;

    Ok(Json(TrackList { tracks }).into_response())
}

/// Repeats detected by the most recent sync
///
/// # Endpoint
/// GET /latest
pub async fn latest(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = signed_in_user(&state, &jar).await? else {
        return Ok(sign_out(&state, jar));
    };

    let ids: Vec<String> = user.latest_repeat_ids.iter().cloned().collect();
    let tracks = state
        .spotify
        .tracks(&user.credentials.access_token, &ids)
        .await?;

    Ok(Json(TrackList { tracks }).into_response())
}
