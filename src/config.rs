use serde::Deserialize;

/// Path the browser is sent to in order to start the Spotify OAuth flow.
pub const AUTHORIZE_REDIRECT_PATH: &str = "/spotify/authorize/redirect";

/// Path Spotify redirects back to once the user has granted access.
pub const AUTHORIZE_CALLBACK_PATH: &str = "/spotify/authorize/callback";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Public host name, used to build the OAuth callback URL
    #[serde(default = "default_hostname")]
    pub hostname: String,

    pub session_secret: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Postgres connection string. Without it users live in memory only.
    pub database_url: Option<String>,

    #[serde(default = "default_state_token_length")]
    pub state_token_length: usize,

    #[serde(default = "default_state_token_charset")]
    pub state_token_charset: String,

    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,

    #[serde(default = "default_rust_log")]
    pub rust_log: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_environment() -> Environment {
    Environment::Development
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_state_token_length() -> usize {
    32
}

fn default_state_token_charset() -> String {
    "abcdefghijklmnopqrstuvwxyz".to_string()
}

fn default_sync_timeout_secs() -> u64 {
    120
}

fn default_rust_log() -> String {
    "info,dw_dedupe=debug".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            environment: default_environment(),
            hostname: default_hostname(),
            session_secret: "test_session_secret".to_string(),
            spotify_client_id: "test_client_id".to_string(),
            spotify_client_secret: "test_client_secret".to_string(),
            spotify_accounts_url: "https://accounts.spotify.test".to_string(),
            spotify_api_url: "https://api.spotify.test".to_string(),
            database_url: None,
            state_token_length: default_state_token_length(),
            state_token_charset: default_state_token_charset(),
            sync_timeout_secs: default_sync_timeout_secs(),
            rust_log: "info".to_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_secret.trim().is_empty() {
            anyhow::bail!("SESSION_SECRET must not be empty");
        }
        if self.state_token_length == 0 {
            anyhow::bail!("STATE_TOKEN_LENGTH must be greater than zero");
        }
        if self.state_token_charset.is_empty() {
            anyhow::bail!("STATE_TOKEN_CHARSET must not be empty");
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Public base URL of this service.
    ///
    /// Development servers are reached over plain HTTP on the configured port,
    /// production sits behind TLS on the default port.
    pub fn base_url(&self) -> String {
        match self.environment {
            Environment::Development => format!("http://{}:{}", self.hostname, self.port),
            Environment::Production => format!("https://{}", self.hostname),
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}{}", self.base_url(), AUTHORIZE_CALLBACK_PATH)
    }
}
