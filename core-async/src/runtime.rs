//! Runtime utilities that abstract over the underlying async executor.
//!
//! Tokio's runtime primitives are wrapped here so that downstream crates never
//! need to depend on Tokio directly.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a lightweight current-thread runtime.
///
/// Must not be called from inside an async context; use [`Handle::try_current`]
/// to detect that case and spawn instead.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}
