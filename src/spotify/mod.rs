pub mod client;
pub mod locator;
pub mod models;
pub mod oauth;
pub mod transport;

pub use client::SpotifyClient;
pub use oauth::AuthorizationFlow;
pub use transport::{ReqwestTransport, Transport};
