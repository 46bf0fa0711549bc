//! Queue items, playback states and read-only snapshots.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bridge_traits::{AudioSource, PlaybackMetadata};
use serde::{Deserialize, Serialize};

use crate::config::RepeatMode;
use crate::error::PlaybackFailure;
use crate::sleep_timer::SleepTimerState;

/// A playable reference held by the queue.
///
/// Immutable once enqueued except through `update_item`, which replaces the
/// whole value in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub source: AudioSource,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    pub duration: Option<Duration>,
    #[serde(default)]
    pub favorited: bool,
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

impl QueueItem {
    pub fn new(id: impl Into<String>, source: AudioSource) -> Self {
        Self {
            id: id.into(),
            source,
            title: None,
            artist: None,
            album: None,
            artwork: None,
            duration: None,
            favorited: false,
            extras: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_favorited(mut self, favorited: bool) -> Self {
        self.favorited = favorited;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Metadata handed to the renderer for the host's now-playing surfaces.
    pub fn metadata(&self) -> PlaybackMetadata {
        PlaybackMetadata {
            track_id: Some(self.id.clone()),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            artwork: self.artwork.clone(),
            extra: self.extras.clone(),
        }
    }
}

/// Playback lifecycle state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    None,
    Loading,
    Ready,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error(PlaybackFailure),
}

impl PlaybackState {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error(_))
    }

    /// States the renderer can leave on its own. `Ended`, `Stopped` and
    /// `Error` only change through an explicit engine action.
    pub fn is_renderer_driven(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading
                | PlaybackState::Ready
                | PlaybackState::Buffering
                | PlaybackState::Playing
                | PlaybackState::Paused
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::None => "none",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Ended => "ended",
            PlaybackState::Error(_) => "error",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Consistent view of the engine taken in a single dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub items: Vec<QueueItem>,
    pub current_index: Option<usize>,
    pub play_order: Vec<usize>,
    pub state: PlaybackState,
    pub play_when_ready: bool,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    pub rate: f32,
    pub sleep_timer: SleepTimerState,
}

impl PlaybackSnapshot {
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|index| self.items.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_copies_display_fields() {
        let item = QueueItem::new("ep-1", AudioSource::remote("https://cdn.example/ep1.mp3"))
            .with_title("Episode 1")
            .with_artist("Host")
            .with_extra("genre", "news");

        let metadata = item.metadata();
        assert_eq!(metadata.track_id.as_deref(), Some("ep-1"));
        assert_eq!(metadata.title.as_deref(), Some("Episode 1"));
        assert_eq!(metadata.extra.get("genre").map(String::as_str), Some("news"));
    }

    #[test]
    fn error_state_serializes_payload() {
        let state = PlaybackState::Error(PlaybackFailure::new(
            bridge_traits::RendererErrorCode::DecodeFailed,
            "bad frame",
        ));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["error"]["message"], "bad frame");

        let idle = serde_json::to_value(PlaybackState::Playing).unwrap();
        assert_eq!(idle["state"], "playing");
    }

    #[test]
    fn renderer_driven_states() {
        assert!(PlaybackState::Buffering.is_renderer_driven());
        assert!(!PlaybackState::Ended.is_renderer_driven());
        assert!(!PlaybackState::Stopped.is_renderer_driven());
    }
}
