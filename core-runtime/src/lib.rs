//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the response pipeline:
//! - Logging and tracing bootstrap
//! - Configuration management (transport timeouts, body logging, bridges)
//!
//! ## Overview
//!
//! Hosts build a [`CoreConfig`](config::CoreConfig) once at startup, call
//! [`init_logging`](logging::init_logging) with its logging section and hand
//! the configured `HttpClient` to the pipeline.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
