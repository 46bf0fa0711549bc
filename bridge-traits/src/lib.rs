//! # Host Bridge Traits
//!
//! Capability traits the host platform implements for the playback engine.
//!
//! ## Overview
//!
//! The engine owns queue, state and retry logic once, in Rust. Everything
//! platform-specific sits behind the traits in this crate and is injected at
//! construction time through `core_runtime::config::CoreConfig`.
//!
//! ## Traits
//!
//! ### Media
//! - [`Renderer`](renderer::Renderer) - Single-track renderer (AVPlayer, ExoPlayer, ...)
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Reachability and change notifications
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Wall-clock source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! A missing required capability is a construction error, never a silent
//! no-op:
//!
//! ```ignore
//! let renderer = config.renderer
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "Renderer".to_string(),
//!         message: "No renderer provided. Inject the platform renderer adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Events
//!
//! Renderers report back through [`RendererNotification`](renderer::RendererNotification)
//! values tagged with the binding they belong to. Hosts forward them to
//! `Player::handle_renderer_event` or feed a stream into `Player::spawn_event_pump`.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! the engine's background tasks.

pub mod error;
pub mod network;
pub mod renderer;
pub mod time;

pub use error::BridgeError;

pub use network::{
    HostNetworkMonitor, NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus,
    NetworkType,
};
pub use renderer::{
    AudioSource, BindingId, PlaybackMetadata, RenderRequest, Renderer, RendererError,
    RendererErrorCode, RendererEvent, RendererNotification,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
