use crate::AppState;
use crate::config::AUTHORIZE_REDIRECT_PATH;
use crate::error::AppError;
use crate::session::SessionState;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Query parameters Spotify appends to the callback URL
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Login page
///
/// # Endpoint
/// GET /login
///
/// # Returns
/// Redirect to `/` when already signed in, otherwise the path that starts
/// the Spotify authorization
pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if state.sessions.load(&jar).user_id().is_some() {
        return Redirect::to("/").into_response();
    }

    Json(json!({ "authorize_url": AUTHORIZE_REDIRECT_PATH })).into_response()
}

/// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    tracing::info!("Signing out");

    let jar = state.sessions.store(jar, &SessionState::Anonymous);
    (jar, Redirect::to("/login"))
}

/// Initiates Spotify OAuth flow
///
/// # Endpoint
/// GET /spotify/authorize/redirect
///
/// # Flow
/// 1. Generate a fresh state token
/// 2. Keep it pending in the session cookie
/// 3. Redirect the user to Spotify for authorization
pub async fn authorize_redirect(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let (state_token, auth_url) = state.auth_flow.begin_authorization();

    tracing::info!("Redirecting to Spotify authorization");

    let jar = state.sessions.store(
        jar,
        &SessionState::PendingAuthorization { state: state_token },
    );

    (jar, Redirect::to(auth_url.as_str()))
}

/// Handles the redirect back from Spotify
///
/// # Endpoint
/// GET /spotify/authorize/callback?code=<CODE>&state=<STATE>
///
/// The pending state is consumed whatever the outcome, so a failed attempt
/// leaves the browser signed out.
///
/// # Errors
/// - 400 if the state does not match the one pending in the session
/// - 401 if Spotify reported an error or rejected the code
/// - 404 if a new user has no Discover Weekly playlist
pub async fn authorize_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> Result<(CookieJar, Redirect), (CookieJar, AppError)> {
    let session = state.sessions.load(&jar);

    let result = state
        .auth_flow
        .complete_authorization(
            state.users.as_ref(),
            params.state.as_deref(),
            session.pending_state(),
            params.code.as_deref(),
            params.error.as_deref(),
        )
        .await;

    match result {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User signed in");

            let jar = state
                .sessions
                .store(jar, &SessionState::Authenticated { user_id: user.id });
            Ok((jar, Redirect::to("/")))
        }
        Err(err) => Err((state.sessions.store(jar, &SessionState::Anonymous), err)),
    }
}
