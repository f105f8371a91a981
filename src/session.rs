//! Browser session stored in a signed cookie.
//!
//! The cookie value is `base64url(json(state)).hex(hmac_sha256(secret, payload))`.
//! Anything that fails to verify or decode reads back as `Anonymous`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "dw_dedupe_session";

/// Where a browser is in the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    PendingAuthorization { state: String },
    Authenticated { user_id: String },
}

impl SessionState {
    pub fn pending_state(&self) -> Option<&str> {
        match self {
            SessionState::PendingAuthorization { state } => Some(state),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }
}

/// Signs and verifies session cookies.
#[derive(Clone)]
pub struct SessionCodec {
    keyed_mac: HmacSha256,
    secure: bool,
}

impl SessionCodec {
    /// `secure` marks the cookie HTTPS-only.
    pub fn new(secret: &str, secure: bool) -> anyhow::Result<Self> {
        let keyed_mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))?;

        Ok(Self { keyed_mac, secure })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed_mac.clone()
    }

    pub fn encode(&self, session: &SessionState) -> String {
        let json = serde_json::to_vec(session).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        format!("{}.{}", payload, signature)
    }

    pub fn decode(&self, value: &str) -> SessionState {
        self.verify(value).unwrap_or_else(|| {
            tracing::debug!("Ignoring invalid session cookie");
            SessionState::Anonymous
        })
    }

    fn verify(&self, value: &str) -> Option<SessionState> {
        let (payload, signature_hex) = value.rsplit_once('.')?;
        let signature = hex::decode(signature_hex).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// Read the session from the request cookies.
    pub fn load(&self, jar: &CookieJar) -> SessionState {
        jar.get(SESSION_COOKIE)
            .map(|cookie| self.decode(cookie.value()))
            .unwrap_or(SessionState::Anonymous)
    }

    /// Write the session into the response cookies.
    pub fn store(&self, jar: CookieJar, session: &SessionState) -> CookieJar {
        let cookie = Cookie::build((SESSION_COOKIE, self.encode(session)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);

        jar.add(cookie)
    }
}
