//! Shared REST client: base URL, timeout, bearer token, and error mapping.

use std::time::Duration;

use parking_lot::RwLock;
use proto::ApiError;
use reqwest::{Method, RequestBuilder, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default path prefix placed between the base URL and every endpoint.
pub const DEFAULT_PREFIX: &str = "/api/v1";

const ERROR_PREVIEW_CHARS: usize = 200;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Scheme + host (+ port), e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Path prefix, e.g. `/api/v1`. May be empty.
    pub prefix: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiSettings {
    /// Settings with the default prefix and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// JSON-over-HTTP client shared by every REST collaborator.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    prefix: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Builds a client from settings.
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            prefix: normalize_prefix(&settings.prefix),
            timeout: settings.timeout,
            token: RwLock::new(None),
        })
    }

    /// Full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// Sets the bearer token sent with every request.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Stops sending a bearer token.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Returns the current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, path)).await
    }

    /// GET with URL query parameters serialized from `query`.
    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::GET, path).query(query))
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, path).json(body))
            .await
    }

    /// POST without a request body, discarding the response body.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, path)).await.map(|_| ())
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::PATCH, path).json(body))
            .await
    }

    /// PATCH whose response body is ignored.
    pub async fn patch_no_content<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, path).json(body))
            .await
            .map(|_| ())
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::Decode(format!("{e}; body: {}", preview(&body)))
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let request = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(%method, %url, "Sending API request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = %status.as_u16(), %url, "API response received");

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Ensures the prefix starts with `/` and has no trailing `/`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Maps a non-success status and body to an [`ApiError`].
///
/// A JSON `detail` or `message` field becomes the error message.
pub(crate) fn status_error(status: u16, body: &str) -> ApiError {
    let message = server_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            preview(body)
        }
    });
    match status {
        401 | 403 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(message),
        _ => ApiError::Status { status, message },
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, prefix: &str) -> ApiClient {
        let mut settings = ApiSettings::new(base);
        settings.prefix = prefix.to_string();
        ApiClient::new(settings).expect("client")
    }

    #[test]
    fn url_joins_base_prefix_and_path() {
        let api = client("http://localhost:8000/", "/api/v1/");
        assert_eq!(
            api.url("/auth/login"),
            "http://localhost:8000/api/v1/auth/login"
        );
    }

    #[test]
    fn url_handles_missing_slash_and_empty_prefix() {
        assert_eq!(client("http://h", "api").url("/x"), "http://h/api/x");
        assert_eq!(client("http://h", "").url("/x"), "http://h/x");
    }

    #[test]
    fn token_can_be_set_and_cleared() {
        let api = client("http://h", "");
        assert!(!api.has_token());
        api.set_token("abc");
        assert_eq!(api.token().as_deref(), Some("abc"));
        api.clear_token();
        assert!(api.token().is_none());
    }

    #[test]
    fn status_error_prefers_server_detail() {
        let err = status_error(401, r#"{"detail":"Incorrect email or password"}"#);
        assert_eq!(
            err,
            ApiError::Unauthorized("Incorrect email or password".to_string())
        );
    }

    #[test]
    fn status_error_maps_not_found_and_generic_statuses() {
        assert!(matches!(status_error(404, ""), ApiError::NotFound(_)));
        match status_error(500, "boom") {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn status_error_describes_empty_body() {
        match status_error(503, "  ") {
            ApiError::Status { message, .. } => {
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
