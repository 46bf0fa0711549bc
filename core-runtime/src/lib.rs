//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Configuration and capability injection
//! - Typed event bus
//!
//! ## Overview
//!
//! The playback crate depends on this one for its ambient concerns. Nothing
//! here knows about queues or playback state; it only establishes how
//! bridges are injected, how logs leave the process and how events reach
//! subscribers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
