//! Workspace facade crate.
//!
//! Re-exports the response pipeline and runtime crates behind feature flags so
//! host applications can depend on `pipeline-workspace` alone instead of wiring
//! each member crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_pipeline as pipeline;

#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;
