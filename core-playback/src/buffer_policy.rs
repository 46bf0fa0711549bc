//! # Buffer Policy
//!
//! Pure decisions about how much media to load and when to start playing.
//!
//! Thresholds scale with playback speed (`max(speed, 1)`) so faster playback
//! needs proportionally more buffered media; slower-than-realtime speeds use
//! the unscaled thresholds. Config changes only affect later decisions and
//! never discard media that is already buffered.

use std::time::Duration;

use core_async::time::secs_f64;
use tracing::debug;

use crate::config::BufferConfig;
use crate::error::{PlaybackError, Result};

/// Where the buffered amount sits relative to the loading thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingZone {
    /// Below `min_buffer` (scaled, capped at `max_buffer`).
    BelowTarget,
    /// Between the scaled minimum and `max_buffer`.
    InBand,
    /// At or above `max_buffer`.
    AtCapacity,
}

#[derive(Debug, Clone, Default)]
pub struct BufferPolicy {
    config: BufferConfig,
}

impl BufferPolicy {
    pub fn new(config: BufferConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Replaces the thresholds after validating them.
    pub fn set_config(&mut self, config: BufferConfig) -> Result<()> {
        config.validate().map_err(PlaybackError::Config)?;
        debug!(
            min_ms = config.min_buffer.as_millis() as u64,
            max_ms = config.max_buffer.as_millis() as u64,
            "Buffer thresholds updated"
        );
        self.config = config;
        Ok(())
    }

    pub fn loading_zone(&self, buffered: Duration, speed: f32) -> LoadingZone {
        if buffered >= self.config.max_buffer {
            return LoadingZone::AtCapacity;
        }

        let target = scale(self.config.min_buffer, speed).min(self.config.max_buffer);
        if buffered < target {
            LoadingZone::BelowTarget
        } else {
            LoadingZone::InBand
        }
    }

    /// Whether the loader should keep fetching.
    ///
    /// Loading continues below the target and inside the band; it only stops
    /// once `max_buffer` is reached.
    pub fn should_continue_loading(&self, buffered: Duration, speed: f32) -> bool {
        !matches!(self.loading_zone(buffered, speed), LoadingZone::AtCapacity)
    }

    /// Whether enough media is buffered to start (or resume) playback.
    pub fn should_start_playback(
        &self,
        buffered: Duration,
        speed: f32,
        is_rebuffering: bool,
    ) -> bool {
        let threshold = if is_rebuffering {
            self.config.buffer_for_playback_after_rebuffer
        } else {
            self.config.buffer_for_playback
        };
        buffered >= scale(threshold, speed)
    }

    /// Earliest position that must stay buffered behind the playhead.
    pub fn retain_from(&self, position: Duration) -> Duration {
        position.saturating_sub(self.config.back_buffer)
    }
}

/// Saturates at `Duration::MAX` for extreme speeds.
fn scale(threshold: Duration, speed: f32) -> Duration {
    let factor = if speed.is_finite() { speed.max(1.0) } else { 1.0 };
    secs_f64(threshold.as_secs_f64() * f64::from(factor))
}
