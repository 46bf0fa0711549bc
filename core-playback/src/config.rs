//! # Player Configuration
//!
//! Runtime-adjustable options for the playback engine: buffering thresholds,
//! retry policy, repeat mode and shuffle.
//!
//! Options are changed through [`PlayerOptions::apply`], which validates the
//! whole update before committing anything and returns an
//! [`OptionsChangeSet`] describing what actually changed so the engine can
//! react to exactly those fields.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

// ============================================================================
// Buffering
// ============================================================================

/// Buffering thresholds used by [`BufferPolicy`](crate::buffer_policy::BufferPolicy).
///
/// All values are durations of media, not wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Keep loading while less than this much is buffered.
    ///
    /// Default: 50 seconds.
    #[serde(default = "default_min_buffer")]
    pub min_buffer: Duration,

    /// Never buffer more than this much ahead.
    ///
    /// Default: 50 seconds.
    #[serde(default = "default_max_buffer")]
    pub max_buffer: Duration,

    /// Buffered duration required to start playback after a seek or bind.
    ///
    /// Default: 2.5 seconds.
    #[serde(default = "default_buffer_for_playback")]
    pub buffer_for_playback: Duration,

    /// Buffered duration required to resume after a rebuffer.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_buffer_for_playback_after_rebuffer")]
    pub buffer_for_playback_after_rebuffer: Duration,

    /// Media kept behind the playhead for fast backward seeks.
    ///
    /// Default: 0.
    #[serde(default)]
    pub back_buffer: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            min_buffer: default_min_buffer(),
            max_buffer: default_max_buffer(),
            buffer_for_playback: default_buffer_for_playback(),
            buffer_for_playback_after_rebuffer: default_buffer_for_playback_after_rebuffer(),
            back_buffer: Duration::ZERO,
        }
    }
}

impl BufferConfig {
    /// Small buffers for fast starts on reliable connections.
    pub fn low_latency() -> Self {
        Self {
            min_buffer: Duration::from_secs(15),
            max_buffer: Duration::from_secs(30),
            buffer_for_playback: Duration::from_secs(1),
            buffer_for_playback_after_rebuffer: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Deep buffers for flaky mobile networks.
    pub fn high_stability() -> Self {
        Self {
            min_buffer: Duration::from_secs(60),
            max_buffer: Duration::from_secs(120),
            buffer_for_playback: Duration::from_secs(5),
            buffer_for_playback_after_rebuffer: Duration::from_secs(10),
            back_buffer: Duration::from_secs(30),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_buffer.is_zero() {
            return Err("max_buffer must be > 0".to_string());
        }

        if self.min_buffer > self.max_buffer {
            return Err("min_buffer cannot exceed max_buffer".to_string());
        }

        if self.buffer_for_playback > self.min_buffer {
            return Err("buffer_for_playback cannot exceed min_buffer".to_string());
        }

        if self.buffer_for_playback_after_rebuffer > self.min_buffer {
            return Err("buffer_for_playback_after_rebuffer cannot exceed min_buffer".to_string());
        }

        Ok(())
    }
}

fn default_min_buffer() -> Duration {
    Duration::from_secs(50)
}

fn default_max_buffer() -> Duration {
    Duration::from_secs(50)
}

fn default_buffer_for_playback() -> Duration {
    Duration::from_millis(2500)
}

fn default_buffer_for_playback_after_rebuffer() -> Duration {
    Duration::from_secs(5)
}

// ============================================================================
// Retry
// ============================================================================

/// How many automatic retries a transient failure may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    Disabled,
    Infinite,
    Limited { max_retries: u32 },
}

/// Retry behaviour for transient load failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_policy")]
    pub policy: RetryPolicy,

    /// Cumulative ceiling measured from the first retry of the current item.
    /// Applies under every policy.
    ///
    /// Default: 120 seconds.
    #[serde(default = "default_max_retry_duration")]
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: default_retry_policy(),
            max_retry_duration: default_max_retry_duration(),
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            policy: RetryPolicy::Disabled,
            ..Default::default()
        }
    }

    pub fn limited(max_retries: u32) -> Self {
        Self {
            policy: RetryPolicy::Limited { max_retries },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_retry_duration.is_zero() && self.policy != RetryPolicy::Disabled {
            return Err("max_retry_duration must be > 0 unless retries are disabled".to_string());
        }
        Ok(())
    }
}

fn default_retry_policy() -> RetryPolicy {
    RetryPolicy::Infinite
}

fn default_max_retry_duration() -> Duration {
    Duration::from_secs(120)
}

// ============================================================================
// Player options
// ============================================================================

/// Repeat behaviour at the end of an item or of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off,
    /// Natural end restarts the current item. Explicit next/previous still move.
    Track,
    /// next/previous wrap around the play order.
    Queue,
}

/// All runtime-adjustable engine options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOptions {
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle_enabled: bool,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Partial update to [`PlayerOptions`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsUpdate {
    pub repeat_mode: Option<RepeatMode>,
    pub shuffle_enabled: Option<bool>,
    pub buffer: Option<BufferConfig>,
    pub retry: Option<RetryConfig>,
}

impl OptionsUpdate {
    pub fn repeat_mode(mode: RepeatMode) -> Self {
        Self {
            repeat_mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn shuffle(enabled: bool) -> Self {
        Self {
            shuffle_enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn buffer(config: BufferConfig) -> Self {
        Self {
            buffer: Some(config),
            ..Default::default()
        }
    }

    pub fn retry(config: RetryConfig) -> Self {
        Self {
            retry: Some(config),
            ..Default::default()
        }
    }
}

/// Fields that actually changed during [`PlayerOptions::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsChangeSet {
    pub repeat_mode: Option<RepeatMode>,
    pub shuffle_enabled: Option<bool>,
    pub buffer: Option<BufferConfig>,
    pub retry: Option<RetryConfig>,
}

impl OptionsChangeSet {
    pub fn is_empty(&self) -> bool {
        self.repeat_mode.is_none()
            && self.shuffle_enabled.is_none()
            && self.buffer.is_none()
            && self.retry.is_none()
    }
}

impl PlayerOptions {
    pub fn validate(&self) -> Result<()> {
        self.buffer.validate().map_err(PlaybackError::Config)?;
        self.retry.validate().map_err(PlaybackError::Config)?;
        Ok(())
    }

    /// Applies `update` atomically.
    ///
    /// Invalid buffer or retry settings reject the whole update and leave
    /// `self` unchanged.
    pub fn apply(&mut self, update: OptionsUpdate) -> Result<OptionsChangeSet> {
        if let Some(buffer) = &update.buffer {
            buffer.validate().map_err(PlaybackError::Config)?;
        }
        if let Some(retry) = &update.retry {
            retry.validate().map_err(PlaybackError::Config)?;
        }

        let mut changes = OptionsChangeSet::default();

        if let Some(mode) = update.repeat_mode.filter(|mode| *mode != self.repeat_mode) {
            self.repeat_mode = mode;
            changes.repeat_mode = Some(mode);
        }

        if let Some(enabled) = update
            .shuffle_enabled
            .filter(|enabled| *enabled != self.shuffle_enabled)
        {
            self.shuffle_enabled = enabled;
            changes.shuffle_enabled = Some(enabled);
        }

        if let Some(buffer) = update.buffer.filter(|buffer| *buffer != self.buffer) {
            self.buffer = buffer.clone();
            changes.buffer = Some(buffer);
        }

        if let Some(retry) = update.retry.filter(|retry| *retry != self.retry) {
            self.retry = retry.clone();
            changes.retry = Some(retry);
        }

        Ok(changes)
    }
}
