use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Method;

/// Credential attached to an outgoing request.
///
/// The token endpoint only accepts the client's own credentials and the Web
/// API only accepts a user's access token, so the two are kept as distinct
/// variants rather than a raw header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// `Basic base64(client_id:client_secret)`, already encoded
    Basic(String),
    /// `Bearer <access_token>`
    Bearer(String),
}

impl Authorization {
    pub fn header_value(&self) -> String {
        match self {
            Authorization::Basic(encoded) => format!("Basic {}", encoded),
            Authorization::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A single HTTP request against Spotify.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub authorization: Authorization,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>, authorization: Authorization) -> Self {
        Self {
            method,
            url: url.into(),
            authorization,
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn query(mut self, query: &[(&str, String)]) -> Self {
        self.query
            .extend(query.iter().map(|(k, v)| (k.to_string(), v.clone())));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, form: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }
}

/// Raw response: status code and the undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to Spotify.
///
/// Every call is attempted once. Retry or rate limiting policies can be layered
/// on by wrapping another transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .header(
                reqwest::header::AUTHORIZATION,
                request.authorization.header_value(),
            );

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Form(form) => builder.form(&form),
        };

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = ?e, "Spotify request failed");
            AppError::Transport(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header_values() {
        assert_eq!(
            Authorization::Basic("Y2xpZW50OnNlY3JldA==".to_string()).header_value(),
            "Basic Y2xpZW50OnNlY3JldA=="
        );
        assert_eq!(
            Authorization::Bearer("token123".to_string()).header_value(),
            "Bearer token123"
        );
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(
            Method::GET,
            "https://api.spotify.com/v1/me/playlists",
            Authorization::Bearer("token".to_string()),
        )
        .query(&[("limit", "50".to_string()), ("offset", "100".to_string())]);

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.query,
            vec![
                ("limit".to_string(), "50".to_string()),
                ("offset".to_string(), "100".to_string())
            ]
        );
        assert_eq!(request.body, RequestBody::Empty);
    }

    #[test]
    fn test_response_success_range() {
        let ok = ApiResponse {
            status: 201,
            body: String::new(),
        };
        let not_found = ApiResponse {
            status: 404,
            body: String::new(),
        };

        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
