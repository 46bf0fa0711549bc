//! # Player Events
//!
//! Host-facing notifications published on a typed
//! [`EventBus`](core_runtime::events::EventBus).
//!
//! ## Ordering
//!
//! Within one engine action events are emitted in a fixed order:
//!
//! 1. `ErrorCleared` (when leaving `Error`)
//! 2. `StateChanged`
//! 3. `PlayingIndicatorChanged` (only when the pair changed)
//! 4. `ErrorSet` after `StateChanged(Error)`, `QueueEnded` after
//!    `StateChanged(Ended)`
//!
//! Subscribers attach with `Player::subscribe` and detach by dropping the
//! stream or calling [`EventStream::unsubscribe`](core_runtime::events::EventStream::unsubscribe).

use std::time::Duration;

use serde::Serialize;

use crate::config::RepeatMode;
use crate::error::PlaybackFailure;
use crate::retry::GiveUpReason;
use crate::sleep_timer::SleepTimerState;
use crate::types::{PlaybackState, QueueItem};

/// What the engine will do about a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryOutcome {
    Scheduled { attempt: u32, delay: Duration },
    WillNotRetry { reason: GiveUpReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PlayerEvent {
    StateChanged(PlaybackState),

    ActiveItemChanged {
        previous_index: Option<usize>,
        previous_item: Option<QueueItem>,
        /// Renderer position of the previous item when it was left.
        previous_position: Duration,
        index: Option<usize>,
        item: Option<QueueItem>,
    },

    QueueChanged {
        length: usize,
    },

    /// Playback reached the end of the last item in play order.
    QueueEnded {
        index: usize,
        position: Duration,
    },

    PlayingIndicatorChanged {
        playing: bool,
        buffering: bool,
    },

    RepeatModeChanged(RepeatMode),

    ShuffleChanged(bool),

    SleepTimerChanged(SleepTimerState),

    ErrorSet {
        error: PlaybackFailure,
        retry: RetryOutcome,
    },

    ErrorCleared,
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::StateChanged(_) => "state_changed",
            PlayerEvent::ActiveItemChanged { .. } => "active_item_changed",
            PlayerEvent::QueueChanged { .. } => "queue_changed",
            PlayerEvent::QueueEnded { .. } => "queue_ended",
            PlayerEvent::PlayingIndicatorChanged { .. } => "playing_indicator_changed",
            PlayerEvent::RepeatModeChanged(_) => "repeat_mode_changed",
            PlayerEvent::ShuffleChanged(_) => "shuffle_changed",
            PlayerEvent::SleepTimerChanged(_) => "sleep_timer_changed",
            PlayerEvent::ErrorSet { .. } => "error_set",
            PlayerEvent::ErrorCleared => "error_cleared",
        }
    }
}
