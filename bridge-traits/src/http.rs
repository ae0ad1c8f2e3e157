//! HTTP Client Abstraction
//!
//! Provides the request/response contract between the response pipeline and
//! the platform HTTP engine, plus the transport configuration surface
//! (timeouts and body logging verbosity).

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::body::Body;
use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Total deadline for this request, from dispatch until the body is
    /// read. Applies on top of the client's connect/read/write deadlines;
    /// the shorter one wins.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Fully buffered HTTP response as delivered to the caller
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Case-insensitive names; repeated headers keep their arrival order
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// `Content-Length` as reported by the server, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        content_length(&self.headers)
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Response whose body has not been read yet
#[derive(Debug)]
pub struct StreamingResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Body,
}

impl StreamingResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: HeaderMap, body: Body) -> Self {
        Self {
            url: url.into(),
            status,
            headers,
            body,
        }
    }

    /// Wrap an already buffered response.
    pub fn from_buffered(url: impl Into<String>, response: HttpResponse) -> Self {
        Self::new(
            url,
            response.status,
            response.headers,
            Body::from_bytes(response.body),
        )
    }

    /// Read the body to completion and hand back a buffered response.
    pub async fn into_buffered(self) -> Result<HttpResponse> {
        let body = self.body.collect().await?;
        Ok(HttpResponse::new(self.status, self.headers, body))
    }

    pub fn content_length(&self) -> Option<u64> {
        content_length(&self.headers)
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// How much of each exchange the transport logger writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyLogLevel {
    /// No transport logging at all
    Off,
    /// Request line, status and headers
    #[default]
    Headers,
    /// Everything in `Headers` plus the (truncated) body
    Body,
}

impl BodyLogLevel {
    pub fn logs_headers(&self) -> bool {
        !matches!(self, BodyLogLevel::Off)
    }

    pub fn logs_body(&self) -> bool {
        matches!(self, BodyLogLevel::Body)
    }
}

impl FromStr for BodyLogLevel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(BodyLogLevel::Off),
            "headers" => Ok(BodyLogLevel::Headers),
            "body" | "full" => Ok(BodyLogLevel::Body),
            other => Err(BridgeError::InvalidConfig(format!(
                "Unknown body log level '{}': expected off, headers or body",
                other
            ))),
        }
    }
}

/// Transport-level configuration for an HTTP engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Deadline for establishing the connection
    pub connect_timeout: Duration,
    /// Deadline for each read while awaiting and streaming the response
    pub read_timeout: Duration,
    /// Deadline for dispatching the request until the response head arrives
    pub write_timeout: Duration,
    pub body_log_level: BodyLogLevel,
    /// Logged bodies are cut at this many bytes
    pub max_logged_body_bytes: usize,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            body_log_level: BodyLogLevel::default(),
            max_logged_body_bytes: 4096,
            user_agent: concat!("response-pipeline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Build a config from whole-second timeouts.
    pub fn from_secs(connect: u64, read: u64, write: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect),
            read_timeout: Duration::from_secs(read),
            write_timeout: Duration::from_secs(write),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_body_log_level(mut self, level: BodyLogLevel) -> Self {
        self.body_log_level = level;
        self
    }

    pub fn with_max_logged_body_bytes(mut self, limit: usize) -> Self {
        self.max_logged_body_bytes = limit;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// All three timeouts must be positive.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("connect", self.connect_timeout),
            ("read", self.read_timeout),
            ("write", self.write_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(BridgeError::InvalidConfig(format!(
                    "{} timeout must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Retry policy configuration
///
/// Owned by callers that opt in through [`HttpClient::execute_with_retry`].
/// Timeouts are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.use_exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor).min(self.max_delay)
        } else {
            self.base_delay
        }
    }
}

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

/// Mask header values that must never reach a log line.
pub fn redact_header(name: &str, value: &str) -> String {
    let name = name.to_ascii_lowercase();
    let sensitive = SENSITIVE_HEADERS.contains(&name.as_str())
        || name.contains("token")
        || name.contains("secret");

    if !sensitive {
        return value.to_string();
    }

    // Keep the auth scheme so logs still tell Bearer from Basic.
    match value.split_once(' ') {
        Some((scheme, _)) if name.ends_with("authorization") => {
            format!("{} [REDACTED]", scheme)
        }
        _ => "[REDACTED]".to_string(),
    }
}

/// Render a header map as `name: value` pairs with credentials masked.
pub fn redacted_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            format!("{}: {}", name, redact_header(name.as_str(), &value))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lossy UTF-8 rendering of at most `limit` bytes, plus whether it was cut.
pub fn body_preview(body: &[u8], limit: usize) -> (Cow<'_, str>, bool) {
    if body.len() <= limit {
        (String::from_utf8_lossy(body), false)
    } else {
        (String::from_utf8_lossy(&body[..limit]), true)
    }
}

/// Async HTTP client trait
///
/// Implementations own the engine: connection pooling, TLS and the three
/// transport deadlines from [`HttpClientConfig`]. Any logging that needs the
/// response body happens here, after the engine has buffered it, or on a
/// teed copy of the stream, so callers always receive the complete body.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch_data(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::get("https://api.example.com/data").bearer_token("token");
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and buffer the full response body.
    ///
    /// Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - A connect, read or write deadline is exceeded ([`BridgeError::Timeout`])
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request and return the body unread.
    ///
    /// The default implementation buffers through [`execute`](Self::execute).
    async fn execute_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        Ok(StreamingResponse::from_buffered(url, response))
    }

    /// Execute an HTTP request with custom retry policy
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }
}
