//! # Core Configuration Module
//!
//! Host capabilities and engine-wide settings for the playback engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder to construct a [`CoreConfig`] that
//! holds every injected bridge. It fails fast: a missing required capability
//! is reported at build time with an actionable message instead of surfacing
//! later as a silent no-op.
//!
//! ## Required Dependencies
//!
//! - `Renderer` - The platform's single-track media renderer
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - Reachability, used to cut retry backoff short
//! - `Clock` - Wall clock for sleep-timer deadlines (default: [`SystemClock`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .renderer(Arc::new(MyRenderer::new()))
//!     .network_monitor(Arc::new(HostNetworkMonitor::default()))
//!     .enable_network_aware_retry(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Fails: no renderer was injected.
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing renderer");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, NetworkMonitor, Renderer, SystemClock};
use std::sync::Arc;

/// Upper bound for the event channel; larger buffers only hide slow subscribers.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the playback engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Platform renderer (required)
    pub renderer: Arc<dyn Renderer>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Wall-clock source
    pub clock: Arc<dyn Clock>,

    /// Capacity of the host event channel
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("renderer", &"Renderer { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Race retry backoff against reachability changes (requires NetworkMonitor)
    pub enable_network_aware_retry: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is within `1..=10_000`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_network_aware_retry && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network-aware retry enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Monitor the retry coordinator should race against, if enabled.
    pub fn retry_network_monitor(&self) -> Option<Arc<dyn NetworkMonitor>> {
        if self.features.enable_network_aware_retry {
            self.network_monitor.clone()
        } else {
            None
        }
    }
}

fn renderer_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Renderer".to_string(),
        message: "A Renderer implementation is required to play anything. \
                 iOS: inject the AVPlayer adapter. \
                 Android: inject the ExoPlayer adapter. \
                 Tests: inject a recording renderer."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    renderer: Option<Arc<dyn Renderer>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the platform renderer (required).
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the network connectivity monitor (optional).
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Overrides the wall-clock source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the host event channel capacity. Defaults to 100.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables racing retry backoff against network restoration.
    pub fn enable_network_aware_retry(mut self, enabled: bool) -> Self {
        self.features.enable_network_aware_retry = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no renderer was injected
    /// - `Config` when values are out of range or flags lack their bridge
    pub fn build(self) -> Result<CoreConfig> {
        let renderer = self.renderer.ok_or_else(renderer_missing_error)?;

        let config = CoreConfig {
            renderer,
            network_monitor: self.network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
