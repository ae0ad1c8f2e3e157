//! Built-in stages
//!
//! - [`HeaderLoggingStage`] - status line and redacted headers
//! - [`BodyLoggingStage`] - body preview through buffer or tee
//! - [`DeserializeStage`] - JSON decoding into a typed value

mod body_logging;
mod deserialize;
mod header_logging;

pub use body_logging::{BodyLoggingStage, ReplayStrategy};
pub use deserialize::{DeserializeStage, EmptyBodyPolicy};
pub use header_logging::HeaderLoggingStage;
