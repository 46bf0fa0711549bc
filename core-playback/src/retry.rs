//! # Retry Coordinator
//!
//! Automatic recovery from transient load failures.
//!
//! ## Overview
//!
//! Only network-class failures are retried. Attempt `k` (0-indexed) waits
//! `min(1.5^k, 5)` seconds. The attempt ceiling (for
//! [`RetryPolicy::Limited`]) and the cumulative duration ceiling are checked
//! before any wait is scheduled, so an exhausted item gives up immediately.
//!
//! When a [`NetworkMonitor`] is available and reports offline, the backoff
//! races a "became reachable" notification with
//! [`first_of`](core_async::race::first_of); reachability cuts the wait
//! short. Every wait is cancellable and a cancelled wait never runs its
//! callback.
//!
//! Counters reset whenever the bound item changes or a retry is triggered
//! manually.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{NetworkMonitor, RendererErrorCode};
use core_async::race::{first_of, with_cancellation, Either};
use core_async::sync::CancellationToken;
use core_async::time::{secs_f64, sleep, Instant};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{RetryConfig, RetryPolicy};
use crate::error::PlaybackFailure;

const BACKOFF_BASE_SECS: f64 = 1.0;
const BACKOFF_FACTOR: f64 = 1.5;
const BACKOFF_MAX_SECS: f64 = 5.0;

/// Delay before retry attempt `attempt` (0-indexed).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    secs_f64((BACKOFF_BASE_SECS * BACKOFF_FACTOR.powi(exponent)).min(BACKOFF_MAX_SECS))
}

/// Why no further retry will happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GiveUpReason {
    NotRetryable { code: RendererErrorCode },
    RetriesDisabled,
    MaxRetriesReached { max_retries: u32 },
    MaxDurationExceeded,
    /// Intent-to-play was off when the failure happened.
    NotPlaying,
    /// No runtime was available to run the backoff wait.
    SchedulingFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule attempt number `attempt` (1-based) after `delay`.
    Retry { attempt: u32, delay: Duration },
    GiveUp(GiveUpReason),
}

pub struct RetryCoordinator {
    config: RetryConfig,
    attempt_count: u32,
    first_retry_time: Option<Instant>,
    pending: Option<CancellationToken>,
    network: Option<Arc<dyn NetworkMonitor>>,
}

impl std::fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("config", &self.config)
            .field("attempt_count", &self.attempt_count)
            .field("first_retry_time", &self.first_retry_time)
            .field("pending", &self.has_pending())
            .field("network_aware", &self.network.is_some())
            .finish()
    }
}

impl RetryCoordinator {
    pub fn new(config: RetryConfig, network: Option<Arc<dyn NetworkMonitor>>) -> Self {
        Self {
            config,
            attempt_count: 0,
            first_retry_time: None,
            pending: None,
            network,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Applies to the next decision; counters are kept.
    pub fn set_config(&mut self, config: RetryConfig) {
        self.config = config;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Decides whether `failure` gets another attempt and records it if so.
    pub fn evaluate(&mut self, failure: &PlaybackFailure, now: Instant) -> RetryDecision {
        if !failure.is_retryable() {
            return RetryDecision::GiveUp(GiveUpReason::NotRetryable {
                code: failure.code.clone(),
            });
        }

        match self.config.policy {
            RetryPolicy::Disabled => {
                return RetryDecision::GiveUp(GiveUpReason::RetriesDisabled);
            }
            RetryPolicy::Limited { max_retries } if self.attempt_count >= max_retries => {
                return RetryDecision::GiveUp(GiveUpReason::MaxRetriesReached { max_retries });
            }
            RetryPolicy::Limited { .. } | RetryPolicy::Infinite => {}
        }

        if !self.within_duration(now) {
            return RetryDecision::GiveUp(GiveUpReason::MaxDurationExceeded);
        }

        let delay = backoff_delay(self.attempt_count);
        self.attempt_count += 1;
        self.first_retry_time.get_or_insert(now);

        RetryDecision::Retry {
            attempt: self.attempt_count,
            delay,
        }
    }

    /// `true` until `max_retry_duration` has elapsed since the first retry.
    pub fn within_duration(&self, now: Instant) -> bool {
        match self.first_retry_time {
            Some(first) => now.saturating_duration_since(first) < self.config.max_retry_duration,
            None => true,
        }
    }

    /// Waits `delay` (or until reachability returns) and then runs `on_fire`.
    ///
    /// Cancels any previously scheduled wait. Returns `false` when there is no
    /// runtime to run the wait on.
    pub fn schedule<F, Fut>(&mut self, delay: Duration, on_fire: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel_pending();

        let token = CancellationToken::new();
        let network = self.network.clone();
        let task_token = token.clone();

        let spawned = core_async::task::try_spawn(async move {
            let waited = with_cancellation(&task_token, backoff_wait(delay, network)).await;
            if waited.is_some() && !task_token.is_cancelled() {
                on_fire().await;
            }
        });

        if spawned.is_none() {
            warn!("No async runtime available; retry not scheduled");
            return false;
        }

        debug!(delay_ms = delay.as_millis() as u64, "Retry wait scheduled");
        self.pending = Some(token);
        true
    }

    pub fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            if !token.is_cancelled() {
                debug!("Pending retry cancelled");
            }
            token.cancel();
        }
    }

    /// Clears counters and cancels any pending wait.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.attempt_count = 0;
        self.first_retry_time = None;
    }
}

impl Drop for RetryCoordinator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

async fn backoff_wait(delay: Duration, network: Option<Arc<dyn NetworkMonitor>>) {
    let Some(monitor) = network else {
        sleep(delay).await;
        return;
    };

    // Subscribe before checking so a restoration in between is not missed.
    let changes = monitor.subscribe_changes().await;
    if monitor.is_connected().await {
        sleep(delay).await;
        return;
    }

    let mut changes = match changes {
        Ok(changes) => changes,
        Err(err) => {
            warn!(error = %err, "Reachability subscription failed; using plain backoff");
            sleep(delay).await;
            return;
        }
    };

    let reachable = async move {
        while let Some(info) = changes.next().await {
            if info.is_connected() {
                return;
            }
        }
        std::future::pending::<()>().await
    };

    if let Either::Right(()) = first_of(sleep(delay), reachable).await {
        info!("Network reachable again; skipping remaining backoff");
    }
}
