//! Workspace facade crate.
//!
//! Host applications depend on `playback-workspace` with the `engine` feature
//! to pull in the playback engine and its runtime without wiring each crate
//! individually.

#[cfg(feature = "engine")]
pub use core_playback as playback;

#[cfg(feature = "engine")]
pub use core_runtime as runtime;
