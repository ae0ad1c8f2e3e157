//! # Core Configuration Module
//!
//! Builds the [`CoreConfig`] a host hands to the response pipeline.
//!
//! ## Overview
//!
//! The only externally tunable surface is the transport: three deadlines
//! (connect, read, write, each a positive number of seconds) and the body
//! logging verbosity (`off` / `headers` / `body`). The builder validates them
//! before anything is constructed and fails fast with actionable messages.
//!
//! ## Dependencies
//!
//! - `HttpClient` - Required. With the `desktop-shims` feature a
//!   `ReqwestHttpClient` built from the transport config is injected when
//!   none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use bridge_traits::BodyLogLevel;
//!
//! let config = CoreConfig::builder()
//!     .connect_timeout_secs(10)
//!     .read_timeout_secs(30)
//!     .write_timeout_secs(30)
//!     .body_log_level(BodyLogLevel::Headers)
//!     .build()?;
//! ```
//!
//! ## Environment overrides
//!
//! [`CoreConfig::from_env`] reads `PIPELINE_CONNECT_TIMEOUT_SECS`,
//! `PIPELINE_READ_TIMEOUT_SECS`, `PIPELINE_WRITE_TIMEOUT_SECS` and
//! `PIPELINE_BODY_LOG` on top of the builder defaults.

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::{BodyLogLevel, HttpClient, HttpClientConfig};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_CONNECT_TIMEOUT: &str = "PIPELINE_CONNECT_TIMEOUT_SECS";
pub const ENV_READ_TIMEOUT: &str = "PIPELINE_READ_TIMEOUT_SECS";
pub const ENV_WRITE_TIMEOUT: &str = "PIPELINE_WRITE_TIMEOUT_SECS";
pub const ENV_BODY_LOG: &str = "PIPELINE_BODY_LOG";

/// Upper bound for any single transport deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Core configuration for the response pipeline.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Transport deadlines and body logging verbosity
    pub http: HttpClientConfig,

    /// Logging bootstrap settings
    pub logging: LoggingConfig,

    /// HTTP engine adapter configured from `http`
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http", &self.http)
            .field("logging", &self.logging)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builder defaults overlaid with `PIPELINE_*` environment variables.
    pub fn from_env() -> Result<CoreConfigBuilder> {
        CoreConfigBuilder::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Checks that every transport deadline is positive and below
    /// [`MAX_TIMEOUT`].
    pub fn validate(&self) -> Result<()> {
        validate_http_config(&self.http)
    }
}

fn validate_http_config(http: &HttpClientConfig) -> Result<()> {
    http.validate()?;

    let timeouts = [
        ("Connect", http.connect_timeout),
        ("Read", http.read_timeout),
        ("Write", http.write_timeout),
    ];
    for (name, value) in timeouts {
        if value > MAX_TIMEOUT {
            return Err(Error::Config(format!(
                "{} timeout of {}s exceeds maximum of {}s",
                name,
                value.as_secs(),
                MAX_TIMEOUT.as_secs()
            )));
        }
    }

    Ok(())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(http: &HttpClientConfig) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::from_config(http.clone())?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_http: &HttpClientConfig) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Other hosts: inject a platform-native adapter with .http_client()."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http: Option<HttpClientConfig>,
    connect_timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    write_timeout_secs: Option<u64>,
    body_log_level: Option<BodyLogLevel>,
    logging: Option<LoggingConfig>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Start from a complete transport configuration.
    ///
    /// Individual setters such as [`read_timeout_secs`](Self::read_timeout_secs)
    /// still override the matching field.
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http = Some(config);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    pub fn read_timeout_secs(mut self, secs: u64) -> Self {
        self.read_timeout_secs = Some(secs);
        self
    }

    pub fn write_timeout_secs(mut self, secs: u64) -> Self {
        self.write_timeout_secs = Some(secs);
        self
    }

    pub fn body_log_level(mut self, level: BodyLogLevel) -> Self {
        self.body_log_level = Some(level);
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Inject a platform HTTP adapter instead of the desktop default.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = parse_secs(&lookup, ENV_CONNECT_TIMEOUT)? {
            self.connect_timeout_secs = Some(secs);
        }
        if let Some(secs) = parse_secs(&lookup, ENV_READ_TIMEOUT)? {
            self.read_timeout_secs = Some(secs);
        }
        if let Some(secs) = parse_secs(&lookup, ENV_WRITE_TIMEOUT)? {
            self.write_timeout_secs = Some(secs);
        }
        if let Some(raw) = lookup(ENV_BODY_LOG) {
            let level = raw
                .parse::<BodyLogLevel>()
                .map_err(|e| Error::Config(format!("{}: {}", ENV_BODY_LOG, e)))?;
            self.body_log_level = Some(level);
        }
        Ok(self)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - A timeout is zero or above [`MAX_TIMEOUT`]
    /// - No `HttpClient` was provided and no platform default is available
    pub fn build(self) -> Result<CoreConfig> {
        let mut http = self.http.unwrap_or_default();

        if let Some(secs) = self.connect_timeout_secs {
            http.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            http.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.write_timeout_secs {
            http.write_timeout = Duration::from_secs(secs);
        }
        if let Some(level) = self.body_log_level {
            http.body_log_level = level;
        }

        validate_http_config(&http)?;

        // Keep the transport log filter in step with the engine's verbosity.
        let logging = self
            .logging
            .unwrap_or_default()
            .with_http_log_level(http.body_log_level);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&http)?,
        };

        Ok(CoreConfig {
            http,
            logging,
            http_client,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| {
                Error::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    key, raw
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};
    use std::collections::HashMap;

    struct StubHttpClient;

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse::new(204, Default::default(), Default::default()))
        }
    }

    fn stub() -> Arc<dyn HttpClient> {
        Arc::new(StubHttpClient)
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_builder_defaults() {
        let config = CoreConfig::builder().http_client(stub()).build().unwrap();

        assert_eq!(config.http, HttpClientConfig::default());
        assert_eq!(config.logging.http_log_level, BodyLogLevel::Headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides_timeouts() {
        let config = CoreConfig::builder()
            .http_client(stub())
            .connect_timeout_secs(3)
            .read_timeout_secs(15)
            .write_timeout_secs(20)
            .body_log_level(BodyLogLevel::Body)
            .build()
            .unwrap();

        assert_eq!(config.http.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.http.read_timeout, Duration::from_secs(15));
        assert_eq!(config.http.write_timeout, Duration::from_secs(20));
        assert_eq!(config.http.body_log_level, BodyLogLevel::Body);
        assert_eq!(config.logging.http_log_level, BodyLogLevel::Body);
    }

    #[test]
    fn test_setters_override_http_config() {
        let base = HttpClientConfig::from_secs(1, 2, 3).with_max_logged_body_bytes(128);
        let config = CoreConfig::builder()
            .http_client(stub())
            .http_config(base)
            .read_timeout_secs(9)
            .build()
            .unwrap();

        assert_eq!(config.http.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.http.read_timeout, Duration::from_secs(9));
        assert_eq!(config.http.max_logged_body_bytes, 128);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = CoreConfig::builder()
            .http_client(stub())
            .read_timeout_secs(0)
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read timeout"));
    }

    #[test]
    fn test_validate_rejects_excessive_timeout() {
        let result = CoreConfig::builder()
            .http_client(stub())
            .connect_timeout_secs(3600)
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_apply_env_overrides() {
        let builder = CoreConfig::builder()
            .http_client(stub())
            .apply_env(env(&[
                (ENV_CONNECT_TIMEOUT, "4"),
                (ENV_READ_TIMEOUT, " 12 "),
                (ENV_BODY_LOG, "off"),
            ]))
            .unwrap();
        let config = builder.build().unwrap();

        assert_eq!(config.http.connect_timeout, Duration::from_secs(4));
        assert_eq!(config.http.read_timeout, Duration::from_secs(12));
        assert_eq!(config.http.write_timeout, Duration::from_secs(30));
        assert_eq!(config.http.body_log_level, BodyLogLevel::Off);
    }

    #[test]
    fn test_apply_env_rejects_garbage() {
        let result = CoreConfig::builder().apply_env(env(&[(ENV_WRITE_TIMEOUT, "soon")]));
        assert!(result.is_err());

        let result = CoreConfig::builder().apply_env(env(&[(ENV_BODY_LOG, "loud")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_debug_hides_client() {
        let config = CoreConfig::builder().http_client(stub()).build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_is_capability_error() {
        let result = CoreConfig::builder().build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_default_client() {
        let config = CoreConfig::builder()
            .read_timeout_secs(5)
            .build()
            .expect("desktop default should succeed");
        assert_eq!(config.http.read_timeout, Duration::from_secs(5));
    }
}
