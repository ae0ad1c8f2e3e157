//! Time-related abstractions.
//!
//! Deadlines are the only timing primitive the pipeline relies on: transport
//! phases that the HTTP engine cannot bound natively are wrapped in
//! [`timeout`].
//!
//! ```rust
//! use core_async::time::{sleep, timeout, Duration};
//!
//! async fn example() {
//!     let slow = timeout(Duration::from_millis(10), sleep(Duration::from_secs(1))).await;
//!     assert!(slow.is_err());
//! }
//! ```

pub use tokio::time::{error::Elapsed, sleep, timeout, Sleep, Timeout};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
