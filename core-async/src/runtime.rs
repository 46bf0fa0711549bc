//! Runtime utilities that abstract over the underlying async executor.
//!
//! Downstream crates never name Tokio's runtime types directly; they go
//! through these re-exports so the executor stays swappable.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Used by synchronous edges such as the logging sink bridge, and by doc
/// tests. Must not be called from inside another runtime.
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

/// Returns `true` when called from within a running runtime.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
