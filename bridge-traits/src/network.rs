//! Network Monitoring Abstraction
//!
//! Provides reachability information. The playback engine uses it to skip the
//! remaining retry backoff as soon as the device comes back online.

use std::sync::Arc;

use core_async::sync::watch;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    /// Cellular/mobile data connection
    Cellular,
    /// WiFi connection
    WiFi,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn connected(network_type: NetworkType) -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: Some(network_type),
            is_metered: matches!(network_type, NetworkType::Cellular),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == NetworkStatus::Connected
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **iOS**: Network framework (`NWPathMonitor`)
/// - **Android**: ConnectivityManager callbacks
/// - **Desktop / tests**: [`HostNetworkMonitor`]
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn offline(monitor: &dyn NetworkMonitor) -> bool {
///     !monitor.is_connected().await
/// }
/// ```
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                ..
            })
        )
    }

    /// Subscribe to network status changes
    ///
    /// Returns a stream of network info updates. Implementations should
    /// emit an event whenever network status changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next network info update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkInfo>;
}

// ============================================================================
// Host-driven implementation
// ============================================================================

/// Reachability monitor whose status is pushed in by the host.
///
/// Mobile hosts forward their native path-monitor callbacks into
/// [`HostNetworkMonitor::update`]; subscribers observe every distinct change.
#[derive(Debug, Clone)]
pub struct HostNetworkMonitor {
    sender: Arc<watch::Sender<NetworkInfo>>,
}

impl HostNetworkMonitor {
    pub fn new(initial: NetworkInfo) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publishes a new network state. Identical consecutive values are not re-broadcast.
    pub fn update(&self, info: NetworkInfo) {
        self.sender.send_if_modified(|current| {
            if *current == info {
                false
            } else {
                *current = info;
                true
            }
        });
    }

    pub fn set_connected(&self, network_type: NetworkType) {
        self.update(NetworkInfo::connected(network_type));
    }

    pub fn set_disconnected(&self) {
        self.update(NetworkInfo::disconnected());
    }

    pub fn current(&self) -> NetworkInfo {
        self.sender.borrow().clone()
    }
}

impl Default for HostNetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkInfo::connected(NetworkType::Other))
    }
}

#[async_trait::async_trait]
impl NetworkMonitor for HostNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        Ok(self.current())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        let mut receiver = self.sender.subscribe();
        receiver.mark_unchanged();
        Ok(Box::new(WatchNetworkStream { receiver }))
    }
}

struct WatchNetworkStream {
    receiver: watch::Receiver<NetworkInfo>,
}

#[async_trait::async_trait]
impl NetworkChangeStream for WatchNetworkStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_info() {
        let info = NetworkInfo::connected(NetworkType::WiFi);

        assert_eq!(info.status, NetworkStatus::Connected);
        assert_eq!(info.network_type, Some(NetworkType::WiFi));
        assert!(!info.is_metered);
        assert!(NetworkInfo::connected(NetworkType::Cellular).is_metered);
    }

    #[tokio::test]
    async fn host_monitor_reports_current_status() {
        let monitor = HostNetworkMonitor::new(NetworkInfo::disconnected());
        assert!(!monitor.is_connected().await);

        monitor.set_connected(NetworkType::WiFi);
        assert!(monitor.is_connected().await);
    }

    #[tokio::test]
    async fn subscribers_see_changes_after_subscription() {
        let monitor = HostNetworkMonitor::new(NetworkInfo::disconnected());
        let mut stream = monitor.subscribe_changes().await.unwrap();

        monitor.set_connected(NetworkType::Cellular);

        let next = stream.next().await.unwrap();
        assert!(next.is_connected());
        assert_eq!(next.network_type, Some(NetworkType::Cellular));
    }

    #[tokio::test]
    async fn duplicate_updates_are_not_rebroadcast() {
        let monitor = HostNetworkMonitor::new(NetworkInfo::disconnected());
        let mut stream = monitor.subscribe_changes().await.unwrap();

        monitor.set_disconnected();
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            stream.next(),
        )
        .await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn stream_closes_when_monitor_dropped() {
        let monitor = HostNetworkMonitor::new(NetworkInfo::disconnected());
        let mut stream = monitor.subscribe_changes().await.unwrap();
        drop(monitor);

        assert!(stream.next().await.is_none());
    }
}
