//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus
//! [`CancellationToken`] from `tokio-util` for cooperative cancellation of
//! background waits.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! # core_async::runtime::block_on(async {
//! let mutex = Mutex::new(1);
//! *mutex.lock().await += 1;
//! assert_eq!(*mutex.lock().await, 2);
//!
//! let token = CancellationToken::new();
//! token.cancel();
//! token.cancelled().await;
//! # });
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OwnedMutexGuard, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
