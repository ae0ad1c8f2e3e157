//! Runtime-agnostic async abstraction layer.
//!
//! Member crates depend on this crate instead of reaching for Tokio directly,
//! so the executor can be swapped per host without touching the pipeline or
//! bridge code.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Deadlines, sleeping and instants
//! - `runtime`: Blocking entry points for sync call sites
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{timeout, Duration};
//!
//! async fn example() {
//!     let result = timeout(Duration::from_millis(50), async { 42 }).await;
//!     assert_eq!(result.ok(), Some(42));
//! }
//! ```

pub mod runtime;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, timeout, Duration, Instant};
