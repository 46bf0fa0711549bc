//! Renderer bridge trait and supporting types.
//!
//! A renderer is the host's single-track media primitive (AVPlayer,
//! ExoPlayer, a desktop audio backend). The playback engine binds exactly one
//! item at a time and drives it through the narrow [`Renderer`] contract.
//! Everything the renderer observes flows back as a [`RendererNotification`]
//! tagged with the [`BindingId`] it was bound under, which lets the engine
//! drop events from a binding it has already replaced.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::Result;

// ============================================================================
// Binding identity
// ============================================================================

/// Identifier of one renderer binding (one item loaded into the renderer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Generate a new binding identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// High-level audio source descriptor provided to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl AudioSource {
    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteStream {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        AudioSource::LocalFile { path: path.into() }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }

    /// Location string suitable for logs (callers should still redact it).
    pub fn location(&self) -> String {
        match self {
            AudioSource::LocalFile { path } => path.display().to_string(),
            AudioSource::RemoteStream { url, .. } => url.clone(),
        }
    }
}

/// Metadata surfaced to the host's now-playing integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    /// Arbitrary extra fields (e.g., genre, description).
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Everything a renderer needs to load one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Binding this request creates; all resulting events must carry it.
    pub binding: BindingId,
    pub source: AudioSource,
    pub metadata: PlaybackMetadata,
    pub start_position: Duration,
    pub rate: f32,
}

impl RenderRequest {
    pub fn new(source: AudioSource) -> Self {
        Self {
            binding: BindingId::new(),
            source,
            metadata: PlaybackMetadata::default(),
            start_position: Duration::ZERO,
            rate: 1.0,
        }
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_start_position(mut self, position: Duration) -> Self {
        self.start_position = position;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure categories reported by renderers.
///
/// The first five are network-class conditions the engine may retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererErrorCode {
    TimedOut,
    NetworkConnectionLost,
    NotConnectedToInternet,
    CannotConnectToHost,
    DnsLookupFailed,
    AssetUnplayable,
    DecodeFailed,
    UnsupportedFormat,
    Other(String),
}

impl RendererErrorCode {
    /// Whether this failure is a transient network condition.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RendererErrorCode::TimedOut
                | RendererErrorCode::NetworkConnectionLost
                | RendererErrorCode::NotConnectedToInternet
                | RendererErrorCode::CannotConnectToHost
                | RendererErrorCode::DnsLookupFailed
        )
    }
}

impl fmt::Display for RendererErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererErrorCode::TimedOut => f.write_str("timed_out"),
            RendererErrorCode::NetworkConnectionLost => f.write_str("network_connection_lost"),
            RendererErrorCode::NotConnectedToInternet => f.write_str("not_connected_to_internet"),
            RendererErrorCode::CannotConnectToHost => f.write_str("cannot_connect_to_host"),
            RendererErrorCode::DnsLookupFailed => f.write_str("dns_lookup_failed"),
            RendererErrorCode::AssetUnplayable => f.write_str("asset_unplayable"),
            RendererErrorCode::DecodeFailed => f.write_str("decode_failed"),
            RendererErrorCode::UnsupportedFormat => f.write_str("unsupported_format"),
            RendererErrorCode::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Error reported by a renderer, either from a control call or asynchronously.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RendererError {
    pub code: RendererErrorCode,
    pub message: String,
}

impl RendererError {
    pub fn new(code: RendererErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Low-level observation from a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RendererEvent {
    /// The bound item can start playing.
    Ready,
    /// The renderer started or stopped waiting for its buffer target.
    BufferingChanged { buffering: bool },
    /// Audio output started or stopped.
    PlayingChanged { playing: bool },
    /// The bound item played to its natural end.
    Ended,
    /// Position jumped (seek completion, loop, host-side correction).
    PositionDiscontinuity { position: Duration },
    /// Loading or playback failed.
    Failed { error: RendererError },
}

/// A renderer event tagged with the binding it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererNotification {
    pub binding: BindingId,
    pub event: RendererEvent,
}

impl RendererNotification {
    pub fn new(binding: BindingId, event: RendererEvent) -> Self {
        Self { binding, event }
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Single-track media renderer supplied by the host platform.
///
/// Implementations deliver [`RendererNotification`]s for the binding most
/// recently passed to [`Renderer::bind`]. Control calls on a renderer with
/// no binding should return `Ok(())`.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Replace whatever is loaded with the requested item.
    async fn bind(&self, request: RenderRequest) -> Result<()>;

    /// Begin or resume output for the current binding.
    async fn play(&self) -> Result<()>;

    /// Pause output without releasing the binding.
    async fn pause(&self) -> Result<()>;

    /// Stop output and release the binding's resources.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position within the bound item.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Set the playback rate (1.0 = normal speed).
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Current playback position of the bound item.
    async fn position(&self) -> Result<Duration>;

    /// Duration of the bound item, when known.
    async fn duration(&self) -> Result<Option<Duration>>;

    /// Furthest position buffered ahead of playback.
    async fn buffered_position(&self) -> Result<Duration>;
}
