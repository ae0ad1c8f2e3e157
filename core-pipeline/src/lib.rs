//! # Response Pipeline
//!
//! Ordered, contract-checked handling of HTTP responses between the
//! platform engine and the caller.
//!
//! ## Overview
//!
//! A response body can be read once. A logging stage that reads it without
//! buffering or teeing leaves every later stage, the JSON decoder included,
//! with an empty body that looks like `Content-Length: 0`. This crate makes
//! that failure hard to build:
//! - Each stage declares a [`StageContract`] (layer, body access, header
//!   mutation)
//! - [`ResponsePipeline`] is an explicit ordered list validated at build time
//! - Built-in stages read the body only through buffer or tee
//! - Every run leaves a per-stage trace of body sizes and warns on target
//!   `http_pipeline` when a stage empties the body
//!
//! ## Components
//!
//! - **Stage contract** (`stage`): [`ResponseStage`], [`BodyAccess`],
//!   [`StageLayer`]
//! - **Response** (`response`): [`PipelineResponse`] and its
//!   `Received → Observed → Delivered` phases
//! - **Pipeline** (`pipeline`): [`ResponsePipeline`] builder and runner
//! - **Stages** (`stages`): [`HeaderLoggingStage`], [`BodyLoggingStage`],
//!   [`DeserializeStage`]
//! - **Client** (`client`): [`PipelineClient`] over any
//!   [`HttpClient`](bridge_traits::HttpClient)

pub mod client;
pub mod error;
pub mod pipeline;
pub mod response;
pub mod stage;
pub mod stages;

pub use client::PipelineClient;
pub use error::{PipelineError, Result};
pub use pipeline::{ResponsePipeline, ResponsePipelineBuilder, DELIVERY};
pub use response::{PipelineResponse, ResponsePhase, StageObservation};
pub use stage::{BodyAccess, ResponseStage, StageContract, StageLayer};
pub use stages::{
    BodyLoggingStage, DeserializeStage, EmptyBodyPolicy, HeaderLoggingStage, ReplayStrategy,
};
