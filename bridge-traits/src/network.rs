//! Network Monitoring Abstraction
//!
//! Provides network connectivity and quality information. The playback core
//! only uses it to decide whether speculative work (preloading the next
//! track) is worth the bandwidth.

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

/// Effective connection class as estimated by the host
/// (Network Information API `effectiveType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectiveConnectionType {
    SlowTwoG,
    TwoG,
    ThreeG,
    FourG,
}

/// Network information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
    /// Whether the connection is considered expensive by the OS
    pub is_expensive: bool,
    /// Estimated connection class, when the host can tell.
    pub effective_type: Option<EffectiveConnectionType>,
    /// User asked the host to reduce data usage.
    pub save_data: bool,
}

impl NetworkInfo {
    /// Connected, unmetered, no quality estimate.
    pub fn unconstrained() -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: None,
            is_metered: false,
            is_expensive: false,
            effective_type: None,
            save_data: false,
        }
    }

    /// Whether speculative downloads should be avoided.
    ///
    /// True when offline, metered, in data-saving mode, or when the
    /// effective connection class is 2G or slower.
    pub fn is_constrained(&self) -> bool {
        if self.status == NetworkStatus::Disconnected || self.save_data || self.is_metered {
            return true;
        }
        matches!(
            self.effective_type,
            Some(EffectiveConnectionType::SlowTwoG | EffectiveConnectionType::TwoG)
        )
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: System network APIs, usually reported as unconstrained
/// - **Web**: Navigator.onLine + Network Information API (limited)
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn may_preload(monitor: &dyn NetworkMonitor) -> bool {
///     !monitor.is_constrained().await
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

    /// Check if connection is metered
    async fn is_metered(&self) -> bool {
        matches!(
            self.get_network_info().await,
            Ok(NetworkInfo {
                is_metered: true,
                ..
            })
        )
    }

    /// Whether the connection is too poor for speculative work.
    ///
    /// An unreadable network state counts as unconstrained.
    async fn is_constrained(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_constrained())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_info() {
        let info = NetworkInfo {
            network_type: Some(NetworkType::WiFi),
            ..NetworkInfo::unconstrained()
        };

        assert_eq!(info.status, NetworkStatus::Connected);
        assert_eq!(info.network_type, Some(NetworkType::WiFi));
        assert!(!info.is_metered);
        assert!(!info.is_constrained());
    }

    #[test]
    fn test_constrained_connections() {
        let slow = NetworkInfo {
            effective_type: Some(EffectiveConnectionType::TwoG),
            ..NetworkInfo::unconstrained()
        };
        assert!(slow.is_constrained());

        let saver = NetworkInfo {
            save_data: true,
            ..NetworkInfo::unconstrained()
        };
        assert!(saver.is_constrained());

        let fast = NetworkInfo {
            effective_type: Some(EffectiveConnectionType::FourG),
            ..NetworkInfo::unconstrained()
        };
        assert!(!fast.is_constrained());

        let metered = NetworkInfo {
            is_metered: true,
            ..NetworkInfo::unconstrained()
        };
        assert!(metered.is_constrained());

        let offline = NetworkInfo {
            status: NetworkStatus::Disconnected,
            ..NetworkInfo::unconstrained()
        };
        assert!(offline.is_constrained());
    }
}
