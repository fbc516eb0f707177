//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "1.1.1.1:443";

/// Desktop network monitor implementation
///
/// Desktop hosts are treated as unmetered with no connection-class estimate;
/// the only signal is reachability, probed with a TCP connect and cached for
/// a short while.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    cache_ttl: Duration,
    cached: Mutex<Option<(Instant, NetworkInfo)>>,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor
    pub fn new() -> Self {
        Self::with_probe(DEFAULT_PROBE_ADDR, Duration::from_secs(2))
    }

    /// Probe a specific `host:port` instead of the default endpoint
    pub fn with_probe(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            probe_addr: addr.into(),
            probe_timeout: timeout,
            cache_ttl: Duration::from_secs(30),
            cached: Mutex::new(None),
        }
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        if let Some((at, info)) = self.cached.lock().as_ref() {
            if at.elapsed() < self.cache_ttl {
                return Ok(info.clone());
            }
        }

        let status = self.check_connectivity().await;
        let info = NetworkInfo {
            status,
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
            ..NetworkInfo::unconstrained()
        };

        *self.cached.lock() = Some((Instant::now(), info.clone()));
        debug!(status = ?status, "Network info updated");

        Ok(info)
    }

    async fn is_metered(&self) -> bool {
        false
    }
}
