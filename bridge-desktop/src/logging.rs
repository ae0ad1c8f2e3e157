//! Transport-level request/response logging
//!
//! Runs inside the engine adapter, beneath the response pipeline. The body is
//! only ever inspected after the engine has buffered it (or on a teed copy),
//! so logging here cannot shorten what the caller receives.

use std::collections::HashMap;
use std::time::Duration;

use bridge_traits::{
    body_preview, redact_header, redacted_headers, BodyLogLevel, BridgeError, HttpClientConfig,
    HttpRequest,
};
use bytes::Bytes;
use http::HeaderMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

const TARGET: &str = "http_transport";

/// Writes `tracing` events for each exchange according to a [`BodyLogLevel`].
#[derive(Debug, Clone)]
pub struct TransportLogger {
    level: BodyLogLevel,
    max_body_bytes: usize,
}

impl TransportLogger {
    pub fn new(level: BodyLogLevel, max_body_bytes: usize) -> Self {
        Self {
            level,
            max_body_bytes,
        }
    }

    pub fn from_config(config: &HttpClientConfig) -> Self {
        Self::new(config.body_log_level, config.max_logged_body_bytes)
    }

    pub fn level(&self) -> BodyLogLevel {
        self.level
    }

    pub fn logs_body(&self) -> bool {
        self.level.logs_body()
    }

    pub fn log_request(&self, request_id: &Uuid, request: &HttpRequest) {
        if !self.level.logs_headers() {
            return;
        }

        info!(
            target: TARGET,
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
            "--> request"
        );
        debug!(
            target: TARGET,
            request_id = %request_id,
            headers = %format_request_headers(&request.headers),
            "--> request headers"
        );

        if self.level.logs_body() {
            if let Some(body) = &request.body {
                let (preview, truncated) = body_preview(body, self.max_body_bytes);
                debug!(
                    target: TARGET,
                    request_id = %request_id,
                    bytes = body.len(),
                    truncated,
                    body = %preview,
                    "--> request body"
                );
            }
        }
    }

    pub fn log_response_head(
        &self,
        request_id: &Uuid,
        status: u16,
        headers: &HeaderMap,
        elapsed: Duration,
    ) {
        if !self.level.logs_headers() {
            return;
        }

        info!(
            target: TARGET,
            request_id = %request_id,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            content_length = ?declared_length(headers),
            "<-- response"
        );
        debug!(
            target: TARGET,
            request_id = %request_id,
            headers = %redacted_headers(headers),
            "<-- response headers"
        );
    }

    /// Log a fully received body.
    ///
    /// `received_bytes` is what actually came over the wire, which is what
    /// to compare against the length a deserializer later reports.
    pub fn log_response_body(&self, request_id: &Uuid, headers: &HeaderMap, body: &Bytes) {
        if !self.level.logs_body() {
            return;
        }

        let (preview, truncated) = body_preview(body, self.max_body_bytes);
        info!(
            target: TARGET,
            request_id = %request_id,
            received_bytes = body.len(),
            content_length = ?declared_length(headers),
            truncated,
            body = %preview,
            "<-- response body"
        );
    }

    pub fn log_failure(&self, request_id: &Uuid, url: &str, error: &BridgeError) {
        if !self.level.logs_headers() {
            return;
        }

        warn!(
            target: TARGET,
            request_id = %request_id,
            url = %url,
            timeout = error.is_timeout(),
            error = %error,
            "<-- failed"
        );
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn format_request_headers(headers: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, redact_header(name, value)))
        .collect();
    pairs.sort();
    pairs.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderValue, CONTENT_LENGTH};

    #[test]
    fn test_format_request_headers_sorted() {
        let mut headers = HashMap::new();
        headers.insert("X-B".to_string(), "2".to_string());
        headers.insert("X-A".to_string(), "1".to_string());
        assert_eq!(format_request_headers(&headers), "X-A: 1; X-B: 2");
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("17"));
        assert_eq!(declared_length(&headers), Some(17));
    }

    #[test]
    fn test_logger_from_config() {
        let config = HttpClientConfig::default().with_body_log_level(BodyLogLevel::Body);
        let logger = TransportLogger::from_config(&config);
        assert_eq!(logger.level(), BodyLogLevel::Body);
        assert!(logger.logs_body());
    }
}
