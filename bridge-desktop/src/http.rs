//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    body::Body,
    error::{BridgeError, Result, TimeoutPhase},
    http::{
        HttpClient, HttpClientConfig, HttpMethod, HttpRequest, HttpResponse, RetryPolicy,
        StreamingResponse,
    },
};
use core_async::time::{self, Instant};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::logging::TransportLogger;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Connect and read deadlines enforced by the engine
/// - A write deadline on request dispatch
/// - Transport-level logging on buffered or teed bodies
pub struct ReqwestHttpClient {
    client: Client,
    config: HttpClientConfig,
    logger: TransportLogger,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::from_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client from transport configuration
    pub fn from_config(config: HttpClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                BridgeError::InvalidConfig(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client, config))
    }

    /// Wrap a preconfigured reqwest client.
    ///
    /// The connect and read deadlines of `client` are taken as is; `config`
    /// still drives the write deadline and logging.
    pub fn with_client(client: Client, config: HttpClientConfig) -> Self {
        let logger = TransportLogger::from_config(&config);
        Self {
            client,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        // Per-request total deadline on top of the engine's phase deadlines
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Map a reqwest failure onto the bridge error kinds.
    ///
    /// `request_timeout` is the per-request total deadline, if any. reqwest
    /// reports it the same way as its own phase deadlines, so whichever of
    /// the two is shorter is the one that fired.
    fn classify_error(
        config: &HttpClientConfig,
        request_timeout: Option<Duration>,
        err: reqwest::Error,
    ) -> BridgeError {
        let fired = |phase_deadline: Duration| {
            request_timeout.map_or(phase_deadline, |total| total.min(phase_deadline))
        };

        if err.is_timeout() {
            if err.is_connect() {
                BridgeError::Timeout {
                    phase: TimeoutPhase::Connect,
                    after: fired(config.connect_timeout),
                }
            } else {
                BridgeError::Timeout {
                    phase: TimeoutPhase::Read,
                    after: fired(config.read_timeout),
                }
            }
        } else if err.is_connect() {
            BridgeError::ConnectionFailed(err.to_string())
        } else {
            BridgeError::OperationFailed(err.to_string())
        }
    }

    /// Send the request and wait for the response head under the write deadline.
    async fn dispatch(&self, request_id: &Uuid, request: HttpRequest) -> Result<reqwest::Response> {
        self.logger.log_request(request_id, &request);

        let url = request.url.clone();
        let request_timeout = request.timeout;
        let write_timeout = self.config.write_timeout;
        let started = Instant::now();

        let outcome = match time::timeout(write_timeout, self.build_request(request).send()).await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(Self::classify_error(&self.config, request_timeout, err)),
            Err(_) => Err(BridgeError::Timeout {
                phase: TimeoutPhase::Write,
                after: write_timeout,
            }),
        };

        match outcome {
            Ok(response) => {
                self.logger.log_response_head(
                    request_id,
                    response.status().as_u16(),
                    response.headers(),
                    started.elapsed(),
                );
                Ok(response)
            }
            Err(err) => {
                self.logger.log_failure(request_id, &url, &err);
                Err(err)
            }
        }
    }

    /// Whether a failed attempt is worth repeating under a retry policy.
    fn is_retryable(outcome: &Result<HttpResponse>) -> bool {
        match outcome {
            Ok(response) => response.is_server_error() || response.status == 429,
            Err(err) => err.is_connection_failure(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request_id = Uuid::new_v4();
        let url = request.url.clone();
        let request_timeout = request.timeout;
        let response = self.dispatch(&request_id, request).await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // The engine buffers the whole body before anything above it runs.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                let err = Self::classify_error(&self.config, request_timeout, err);
                self.logger.log_failure(&request_id, &url, &err);
                return Err(err);
            }
        };

        self.logger.log_response_body(&request_id, &headers, &body);

        Ok(HttpResponse::new(status, headers, body))
    }

    async fn execute_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let request_id = Uuid::new_v4();
        let url = request.url.clone();
        let response = self.dispatch(&request_id, request).await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();

        let stream = response.bytes_stream().map_err(|err| {
            let kind = if err.is_timeout() {
                io::ErrorKind::TimedOut
            } else {
                io::ErrorKind::Other
            };
            io::Error::new(kind, err)
        });
        let body = Body::from_stream(stream);

        if !self.logger.logs_body() {
            return Ok(StreamingResponse::new(final_url, status, headers, body));
        }

        // Log from a teed copy so the caller's half stays complete.
        let (caller, observer) = body.tee();
        let logger = self.logger.clone();
        let logged_headers = headers.clone();
        core_async::spawn(async move {
            match observer.collect().await {
                Ok(bytes) => logger.log_response_body(&request_id, &logged_headers, &bytes),
                Err(err) => logger.log_failure(&request_id, &url, &err),
            }
        });

        Ok(StreamingResponse::new(final_url, status, headers, caller))
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts = policy.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            let outcome = self.execute(request.clone()).await;

            if attempt >= policy.max_attempts || !Self::is_retryable(&outcome) {
                return outcome;
            }

            match &outcome {
                Ok(response) => warn!(
                    status = response.status,
                    attempt,
                    "HTTP request failed with retryable status"
                ),
                Err(err) => warn!(error = %err, attempt, "HTTP request failed"),
            }

            let delay = policy.delay_for(attempt);
            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            time::sleep(delay).await;
        }
    }
}
