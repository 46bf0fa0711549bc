//! Task spawning.
//!
//! Engine components schedule background work (retry waits, sleep timers)
//! from code paths that may run without an ambient runtime, e.g. synchronous
//! unit tests. [`try_spawn`] makes that explicit instead of panicking.

pub use tokio::task::{yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// # Panics
///
/// Panics when called outside of a runtime, like `tokio::spawn`.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # core_async::runtime::block_on(async {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # });
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Spawns `future` if a runtime is available, returning `None` otherwise.
pub fn try_spawn<F>(future: F) -> Option<JoinHandle<F::Output>>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.spawn(future))
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
