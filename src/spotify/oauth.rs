use crate::config::Config;
use crate::db::UserStore;
use crate::db::models::User;
use crate::error::AppError;
use crate::spotify::client::SpotifyClient;
use crate::sync::engine::SyncEngine;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, basic::BasicClient, url::Url};
use rand::{Rng, rngs::OsRng};

/// Scopes needed to read the user's playlists and maintain a private one.
pub const SCOPES: [&str; 2] = ["playlist-read-private", "playlist-modify-private"];

/// Build the OAuth2 client used to construct Spotify authorization URLs.
pub fn build_oauth_client(config: &Config) -> anyhow::Result<BasicClient> {
    let auth_url = AuthUrl::new(format!(
        "{}/authorize",
        config.spotify_accounts_url.trim_end_matches('/')
    ))?;
    let redirect_url = RedirectUrl::new(config.callback_url())?;

    Ok(BasicClient::new(
        ClientId::new(config.spotify_client_id.clone()),
        None,
        auth_url,
        None,
    )
    .set_redirect_uri(redirect_url))
}

/// Generate an opaque OAuth state token.
///
/// Characters are drawn uniformly from `charset` using the operating system's
/// CSPRNG.
pub fn generate_state_token(length: usize, charset: &str) -> String {
    let alphabet: Vec<char> = charset.chars().collect();
    if alphabet.is_empty() {
        return String::new();
    }

    let mut rng = OsRng;
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

/// Drives the Spotify authorization code flow and the first sync of new users.
#[derive(Clone)]
pub struct AuthorizationFlow {
    oauth_client: BasicClient,
    spotify: SpotifyClient,
    engine: SyncEngine,
    state_token_length: usize,
    state_token_charset: String,
}

impl AuthorizationFlow {
    pub fn new(config: &Config, spotify: SpotifyClient, engine: SyncEngine) -> anyhow::Result<Self> {
        Ok(Self {
            oauth_client: build_oauth_client(config)?,
            spotify,
            engine,
            state_token_length: config.state_token_length,
            state_token_charset: config.state_token_charset.clone(),
        })
    }

    /// Start an authorization attempt.
    ///
    /// # Returns
    /// The state token to keep pending in the session and the Spotify
    /// authorization URL to redirect the browser to
    pub fn begin_authorization(&self) -> (String, Url) {
        let state = generate_state_token(self.state_token_length, &self.state_token_charset);

        let (auth_url, _csrf_token) = self
            .oauth_client
            .authorize_url(|| CsrfToken::new(state.clone()))
            .add_scopes(SCOPES.iter().map(|scope| Scope::new(scope.to_string())))
            .url();

        tracing::debug!(
            state_token_length = state.len(),
            "Generated OAuth state token"
        );

        (state, auth_url)
    }

    /// Finish an authorization attempt and return the signed-in user.
    ///
    /// # Flow
    /// 1. Reject the callback unless its state equals the pending state
    /// 2. Reject provider-reported errors
    /// 3. Exchange the code for credentials and fetch the profile
    /// 4. Merge into the stored user, or bootstrap and sync a new one
    /// 5. Persist the user
    ///
    /// # Errors
    /// - `StateMismatch` if the states differ or either is missing; no token
    ///   request is made in that case
    /// - `Auth` if Spotify reported an error or rejected the code
    /// - `SourceNotFound` if a new user has no Discover Weekly playlist
    /// - Any API or store error on the way
    pub async fn complete_authorization(
        &self,
        users: &dyn UserStore,
        returned_state: Option<&str>,
        pending_state: Option<&str>,
        code: Option<&str>,
        provider_error: Option<&str>,
    ) -> Result<User, AppError> {
        match (returned_state, pending_state) {
            (Some(returned), Some(pending)) if returned == pending => {}
            (returned, pending) => {
                tracing::error!(
                    callback_state = ?returned,
                    session_state = ?pending,
                    "OAuth states don't match"
                );
                return Err(AppError::StateMismatch);
            }
        }

        if let Some(error) = provider_error {
            tracing::error!(error = error, "Spotify authorization error");
            return Err(AppError::Auth(format!("authorization denied: {}", error)));
        }

        let code = code.ok_or_else(|| AppError::BadRequest("Missing code".to_string()))?;

        let credentials = self.spotify.exchange_code(code).await?;
        let profile = self.spotify.current_user(&credentials.access_token).await?;

        tracing::info!(user_id = %profile.id, "Spotify authorization successful");

        let user = match users.get(&profile.id).await? {
            Some(mut existing) => {
                existing.display_name = profile.display_name;
                existing.credentials = credentials;
                existing
            }
            None => {
                tracing::info!(user_id = %profile.id, "New user, running first sync");

                let mut user = User::new(profile.id, profile.display_name, credentials);
                self.engine.resolve_discover_weekly(&mut user).await?;
                self.engine.reconcile(user).await?
            }
        };

        users.put(&user).await?;

        Ok(user)
    }
}
