//! Async abstraction layer for the playback engine.
//!
//! All engine crates depend on this crate instead of reaching for tokio
//! directly, so the executor can be swapped in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning
//! - `time`: Sleep, instants and wall-clock helpers
//! - `sync`: Locks, channels and cooperative cancellation
//! - `race`: "first of two futures" with guaranteed cancellation of the loser
//! - `runtime`: Runtime handles and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::race::{first_of, Either};
//! use core_async::time::{sleep, Duration};
//!
//! # core_async::runtime::block_on(async {
//! let winner = first_of(sleep(Duration::from_millis(5)), async { 7 }).await;
//! assert!(matches!(winner, Either::Right(7)));
//! # });
//! ```

pub mod race;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
