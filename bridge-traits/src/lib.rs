//! # Host Bridge Traits
//!
//! Contract between the response pipeline and the platform HTTP engine.
//!
//! ## Overview
//!
//! The pipeline never talks to an HTTP library directly. It consumes the
//! [`HttpClient`](http::HttpClient) trait, and each host platform ships an
//! adapter that owns the engine, its timeouts and its transport-level logging.
//!
//! ## Modules
//!
//! - [`body`] - Single-consumption response body with explicit buffer/tee
//! - [`http`] - Requests, responses, engine configuration and the client trait
//! - [`logging`] - Structured log entries and the host [`LoggerSink`]
//! - [`error`] - [`BridgeError`], including distinguishable timeouts
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//!
//! ## Error Handling
//!
//! Platform implementations convert engine errors into [`BridgeError`]. A
//! deadline that fires must surface as [`BridgeError::Timeout`] with the phase
//! that expired, never as a short or empty body.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single client can serve many
//! concurrent requests. Requests share no mutable state through the trait.

pub mod body;
pub mod error;
pub mod http;
pub mod logging;

pub use error::{BridgeError, TimeoutPhase};

pub use body::{Body, BodyStream};
pub use self::http::{
    body_preview, redact_header, redacted_headers, BodyLogLevel, HttpClient, HttpClientConfig,
    HttpMethod, HttpRequest, HttpResponse, RetryPolicy, StreamingResponse,
};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
