//! # Stage Contract
//!
//! Every participant in response handling declares up front what it does to
//! the response. The pipeline checks those declarations when it is built, so
//! an unsafe ordering fails at startup instead of as an empty body in
//! production.
//!
//! ## Body access
//!
//! | Access | Reads body | Body afterwards |
//! |--------|------------|-----------------|
//! | `None` | no | untouched |
//! | `ReadReplay` | yes, via buffer or tee | full content |
//! | `ReadDiscard` | yes, destructively | consumed (empty) |
//! | `Consume` | yes, via buffer | full content, decoded value attached |
//!
//! Delivery to the caller reads the body after the last stage, so a
//! validated pipeline never contains a `ReadDiscard` stage.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::response::PipelineResponse;

/// Where in the stack a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageLayer {
    /// Beneath deserialization; runs ahead of every application stage on a
    /// body the pipeline has buffered
    Transport,
    /// Above the engine, on the body as the engine delivered it
    Application,
}

/// How a stage touches the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyAccess {
    None,
    ReadReplay,
    ReadDiscard,
    Consume,
}

impl BodyAccess {
    pub fn reads_body(&self) -> bool {
        !matches!(self, BodyAccess::None)
    }

    /// True when the body is gone once the stage has run.
    pub fn is_destructive(&self) -> bool {
        matches!(self, BodyAccess::ReadDiscard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyAccess::None => "none",
            BodyAccess::ReadReplay => "read-replay",
            BodyAccess::ReadDiscard => "read-discard",
            BodyAccess::Consume => "consume",
        }
    }
}

impl fmt::Display for BodyAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Declared read/mutate contract of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageContract {
    pub layer: StageLayer,
    pub body: BodyAccess,
    pub mutates_headers: bool,
}

impl StageContract {
    pub const fn new(layer: StageLayer, body: BodyAccess) -> Self {
        Self {
            layer,
            body,
            mutates_headers: false,
        }
    }

    pub const fn mutating_headers(mut self) -> Self {
        self.mutates_headers = true;
        self
    }
}

/// A named, ordered participant in response handling.
///
/// Stages get exclusive access to the in-flight response while they run and
/// must leave it in the state their [`StageContract`] promises.
#[async_trait]
pub trait ResponseStage: Send + Sync {
    /// Unique name within a pipeline; used in ordering errors and logs.
    fn name(&self) -> &str;

    fn contract(&self) -> StageContract;

    async fn process(&self, response: &mut PipelineResponse) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_access_classification() {
        assert!(!BodyAccess::None.reads_body());
        assert!(BodyAccess::ReadReplay.reads_body());
        assert!(BodyAccess::Consume.reads_body());
        assert!(BodyAccess::ReadDiscard.is_destructive());
        assert!(!BodyAccess::ReadReplay.is_destructive());
        assert!(!BodyAccess::Consume.is_destructive());
    }

    #[test]
    fn test_contract_builder() {
        let contract = StageContract::new(StageLayer::Transport, BodyAccess::None);
        assert!(!contract.mutates_headers);
        assert!(contract.mutating_headers().mutates_headers);
        assert_eq!(BodyAccess::ReadDiscard.to_string(), "read-discard");
    }
}
