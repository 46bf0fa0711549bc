//! # Playback Engine Core
//!
//! Queue management, shuffle, playback state, retry, buffering decisions and
//! the sleep timer for a single-track mobile audio player.
//!
//! ## Overview
//!
//! The host supplies a [`Renderer`](bridge_traits::Renderer) that can play one
//! item at a time. This crate decides *what* it plays and *when*:
//!
//! - [`queue`] - Ordered items, the current cursor and navigation
//! - [`shuffle`] - Play-order permutation kept in sync with the queue
//! - [`state`] - Playback state machine and playing/buffering indicator
//! - [`retry`] - Backoff, retry budget and network-aware waits
//! - [`buffer_policy`] - Load-control and start-playback thresholds
//! - [`sleep_timer`] - Timed or end-of-item pause
//! - [`player`] - The engine tying everything to the renderer
//!
//! Hosts observe the engine through [`PlayerEvent`]s on a broadcast bus.

pub mod buffer_policy;
pub mod config;
pub mod error;
pub mod events;
pub mod player;
pub mod queue;
pub mod retry;
pub mod shuffle;
pub mod sleep_timer;
pub mod state;
pub mod types;

pub use buffer_policy::{BufferPolicy, LoadingZone};
pub use config::{
    BufferConfig, OptionsChangeSet, OptionsUpdate, PlayerOptions, RepeatMode, RetryConfig,
    RetryPolicy,
};
pub use error::{PlaybackError, PlaybackFailure, QueueError, Result};
pub use events::{PlayerEvent, RetryOutcome};
pub use player::Player;
pub use queue::{ActiveItemChange, CursorMove, QueueStore};
pub use retry::{backoff_delay, GiveUpReason, RetryCoordinator, RetryDecision};
pub use shuffle::ShuffleOrder;
pub use sleep_timer::{SleepTimer, SleepTimerState};
pub use state::{PlaybackStateMachine, PlayingIndicator, TransitionOutcome};
pub use types::{PlaybackSnapshot, PlaybackState, QueueItem};

pub use bridge_traits::{AudioSource, BindingId, RendererErrorCode, RendererEvent};
