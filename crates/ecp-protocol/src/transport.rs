//! HTTP transport for ECP endpoints
//!
//! All failure at this boundary is represented as `false` / `None`;
//! network errors never propagate past it.

use crate::commands::Command;
use crate::types::{DeviceInfo, PowerState, ECP_PORT};

use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Timeout profile for directed commands and status checks
pub const NORMAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout profile for the 254-way subnet sweep, where long timeouts
/// are prohibitive
pub const SWEEP_TIMEOUT: Duration = Duration::from_millis(850);

/// Client seam used by the dispatcher, discovery engine, and scheduler
pub trait EcpClient: Send + Sync + 'static {
    /// POST a command, true iff the response status is 2xx
    fn send(&self, address: &str, command: &Command) -> impl Future<Output = bool> + Send;

    /// Fetch name and power mode from `query/device-info`
    fn device_info(&self, address: &str) -> impl Future<Output = Option<DeviceInfo>> + Send;

    /// Momentary power-mode read; `None` means unreachable
    fn power_state(&self, address: &str) -> impl Future<Output = Option<PowerState>> + Send;

    /// Short-timeout status probe used during discovery sweeps
    fn probe(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// HTTP transport holding the two timeout profiles
pub struct EcpTransport {
    client: Client,
    sweep_client: Client,
}

impl EcpTransport {
    /// Build both HTTP clients
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(NORMAL_TIMEOUT)
            .timeout(NORMAL_TIMEOUT)
            .build()?;
        let sweep_client = Client::builder()
            .connect_timeout(SWEEP_TIMEOUT)
            .timeout(SWEEP_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            sweep_client,
        })
    }

    async fn fetch_device_info(&self, address: &str) -> Option<DeviceInfo> {
        let url = format!("http://{address}:{ECP_PORT}/query/device-info");
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await.ok()?;
                Some(DeviceInfo::parse(&body))
            }
            Ok(resp) => {
                tracing::debug!("device-info on {} returned {}", address, resp.status());
                None
            }
            Err(e) => {
                tracing::debug!("device-info error on {}: {}", address, e);
                None
            }
        }
    }
}

impl EcpClient for EcpTransport {
    async fn send(&self, address: &str, command: &Command) -> bool {
        let url = format!("http://{address}:{ECP_PORT}/{}", command.path());
        match self.client.post(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("command {} to {} failed: {}", command.path(), address, e);
                false
            }
        }
    }

    async fn device_info(&self, address: &str) -> Option<DeviceInfo> {
        self.fetch_device_info(address).await
    }

    async fn power_state(&self, address: &str) -> Option<PowerState> {
        self.fetch_device_info(address).await.map(|info| info.power)
    }

    async fn probe(&self, address: &str) -> bool {
        let url = format!("http://{address}:{ECP_PORT}/query/device-info");
        match self.sweep_client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // An address that cannot form a valid URL fails inside reqwest
    // without touching the network.
    const BAD_ADDRESS: &str = "definitely not an address";

    #[tokio::test]
    async fn test_unreachable_address_yields_none() {
        let transport = EcpTransport::new().expect("client build");
        assert!(transport.device_info(BAD_ADDRESS).await.is_none());
        assert!(transport.power_state(BAD_ADDRESS).await.is_none());
        // Repeated calls stay quiet too
        assert!(transport.power_state(BAD_ADDRESS).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_send_maps_to_false() {
        let transport = EcpTransport::new().expect("client build");
        assert!(!transport.send(BAD_ADDRESS, &Command::PowerOn).await);
        assert!(!transport.probe(BAD_ADDRESS).await);
    }
}
