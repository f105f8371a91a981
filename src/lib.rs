pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod session;
pub mod spotify;
pub mod sync;
pub mod telemetry;

use axum::Router;
use config::Config;
use db::{MemoryUserStore, PgUserStore, UserStore};
use session::SessionCodec;
use spotify::{AuthorizationFlow, ReqwestTransport, SpotifyClient, Transport};
use std::sync::Arc;
use sync::SyncEngine;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Shared state handed to every request handler.
pub struct AppState {
    pub config: Config,
    pub spotify: SpotifyClient,
    pub engine: SyncEngine,
    pub auth_flow: AuthorizationFlow,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionCodec,
    /// Held for the duration of a batch run
    pub batch_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        users: Arc<dyn UserStore>,
    ) -> anyhow::Result<Self> {
        let spotify = SpotifyClient::new(transport, &config);
        let engine = SyncEngine::from_config(spotify.clone(), &config);
        let auth_flow = AuthorizationFlow::new(&config, spotify.clone(), engine.clone())?;
        let sessions = SessionCodec::new(&config.session_secret, !config.is_development())?;

        Ok(Self {
            config,
            spotify,
            engine,
            auth_flow,
            users,
            sessions,
            batch_lock: Mutex::new(()),
        })
    }
}

/// Build the application router with request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    routes::create_router(state).layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    telemetry::init_tracing(&config.rust_log, config.log_format);

    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(database_url) => Arc::new(PgUserStore::new(db::init_pool(database_url).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory only");
            Arc::new(MemoryUserStore::new())
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        environment = ?config.environment,
        callback_url = %config.callback_url(),
        "Starting server on {}",
        addr
    );

    let state = Arc::new(AppState::new(
        config,
        Arc::new(ReqwestTransport::new()),
        users,
    )?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
