//! # Desktop Bridge Implementations
//!
//! Default [`HttpClient`](bridge_traits::HttpClient) for desktop platforms
//! (macOS, Windows, Linux) built on `reqwest`.
//!
//! ## Overview
//!
//! The engine owns everything below the response pipeline:
//! - Connect and read deadlines enforced natively by `reqwest`
//! - A write deadline on the request-dispatch phase
//! - Transport-level logging through [`TransportLogger`], which only ever
//!   looks at a buffered body or a teed copy of the stream
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use bridge_traits::{BodyLogLevel, HttpClient, HttpClientConfig, HttpRequest};
//!
//! let config = HttpClientConfig::from_secs(10, 30, 30).with_body_log_level(BodyLogLevel::Body);
//! let client = ReqwestHttpClient::from_config(config)?;
//! let response = client.execute(HttpRequest::get("https://example.com/items")).await?;
//! ```

mod http;
mod logging;

pub use self::http::ReqwestHttpClient;
pub use logging::TransportLogger;
