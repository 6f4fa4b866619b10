//! Device discovery
//!
//! SSDP multicast query first; if nothing answers within the listen
//! window, fall back to a short-timeout HTTP probe of every host in the
//! local /24.

use crate::device::RokuDevice;
use ecp_protocol::{EcpClient, PLACEHOLDER_NAME};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Instant};

/// Standard SSDP multicast group and port
pub const SSDP_GROUP: &str = "239.255.255.250:1900";

/// Default overall listen window for multicast replies
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Gap between the two copies of the search request
const RESEND_JITTER: Duration = Duration::from_millis(200);

/// Parallelism bound for the 254-host sweep
const SWEEP_CONCURRENCY: usize = 32;

const SSDP_SEARCH: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 1\r\n\
    ST: roku:ecp\r\n\r\n";

/// Finds ECP devices on the local subnet
pub struct DiscoveryEngine<C> {
    client: Arc<C>,
}

impl<C: EcpClient> DiscoveryEngine<C> {
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Run one discovery pass and enrich every candidate with a display
    /// name
    ///
    /// Output order is irrelevant; the caller merges the result into the
    /// registry, where pre-existing names win.
    pub async fn discover(&self, listen_window: Duration) -> Vec<RokuDevice> {
        let multicast = self.multicast_query(listen_window).await;
        let candidates = fallback(multicast, || self.subnet_sweep()).await;
        self.enrich(candidates).await
    }

    /// Send the M-SEARCH request and collect unicast replies until the
    /// listen window elapses
    async fn multicast_query(&self, listen_window: Duration) -> HashSet<String> {
        let mut found = HashSet::new();

        let socket = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!("Failed to open discovery socket: {}", e);
                return found;
            }
        };

        if let Err(e) = socket.send_to(SSDP_SEARCH.as_bytes(), SSDP_GROUP).await {
            tracing::warn!("Failed to send M-SEARCH: {}", e);
            return found;
        }
        // Second copy; replies to the first keep queuing in the socket
        // buffer meanwhile
        sleep(RESEND_JITTER).await;
        let _ = socket.send_to(SSDP_SEARCH.as_bytes(), SSDP_GROUP).await;

        let deadline = Instant::now() + listen_window;
        let mut buf = [0u8; 4096];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, peer))) => {
                    let text = String::from_utf8_lossy(&buf[..len]);
                    // Per-packet parse failures never abort the loop
                    if let Some(host) = parse_location_host(&text) {
                        tracing::debug!("SSDP reply from {}: {}", peer, host);
                        found.insert(host);
                    }
                }
                Ok(Err(e)) => {
                    tracing::debug!("Discovery socket error: {}", e);
                }
                Err(_) => break, // listen window elapsed
            }
        }

        if !found.is_empty() {
            tracing::info!("SSDP found {} device(s)", found.len());
        }
        found
    }

    /// Probe all 254 hosts of the local /24, excluding ourselves
    async fn subnet_sweep(&self) -> HashSet<String> {
        tracing::warn!("No SSDP response, running HTTP subnet sweep");

        let Some(local) = local_ipv4() else {
            tracing::warn!("Could not determine local IPv4 address, skipping sweep");
            return HashSet::new();
        };

        let found: HashSet<String> = stream::iter(subnet_hosts(local))
            .map(|address| {
                let client = Arc::clone(&self.client);
                async move { client.probe(&address).await.then_some(address) }
            })
            .buffer_unordered(SWEEP_CONCURRENCY)
            .filter_map(|hit| async move { hit })
            .collect()
            .await;

        tracing::info!("Subnet sweep found {} device(s)", found.len());
        found
    }

    /// Best-effort name lookup for every candidate address
    async fn enrich(&self, candidates: HashSet<String>) -> Vec<RokuDevice> {
        let lookups = candidates.into_iter().map(|address| {
            let client = Arc::clone(&self.client);
            async move {
                let name = client
                    .device_info(&address)
                    .await
                    .map_or_else(|| PLACEHOLDER_NAME.to_string(), |info| info.name);
                RokuDevice::new(address, name)
            }
        });
        futures::future::join_all(lookups).await
    }
}

/// Run the sweep only when the multicast pass came back empty
async fn fallback<F, Fut>(multicast: HashSet<String>, sweep: F) -> HashSet<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = HashSet<String>>,
{
    if multicast.is_empty() {
        sweep().await
    } else {
        multicast
    }
}

/// Pull the host out of an SSDP reply's `LOCATION:` header
fn parse_location_host(reply: &str) -> Option<String> {
    let line = reply.lines().find(|line| {
        line.get(..9)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("location:"))
    })?;
    let url = line[9..].trim();

    // Drop the scheme, then cut at the port or path
    let host = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let end = host.find([':', '/']).unwrap_or(host.len());
    let host = &host[..end];

    (!host.is_empty()).then(|| host.to_string())
}

/// Local IPv4 of the active interface, via a routed (never sent) UDP
/// connect
fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }
}

/// All 254 host addresses of the /24 around `local`, excluding `local`
/// itself
fn subnet_hosts(local: Ipv4Addr) -> Vec<String> {
    let [a, b, c, own] = local.octets();
    (1..=254)
        .filter(|&last| last != own)
        .map(|last| format!("{a}.{b}.{c}.{last}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_parse_location_host() {
        let reply = "HTTP/1.1 200 OK\r\nCache-Control: max-age=300\r\n\
                     LOCATION: http://192.168.1.42:8060/\r\nST: roku:ecp\r\n\r\n";
        assert_eq!(parse_location_host(reply).as_deref(), Some("192.168.1.42"));

        let lowercase = "location: http://10.0.0.7:8060/dial/dd.xml\r\n";
        assert_eq!(parse_location_host(lowercase).as_deref(), Some("10.0.0.7"));

        assert_eq!(parse_location_host("HTTP/1.1 200 OK\r\nST: upnp:rootdevice\r\n"), None);
        assert_eq!(parse_location_host("LOCATION: http://\r\n"), None);
    }

    #[test]
    fn test_subnet_hosts_excludes_local() {
        let hosts = subnet_hosts(Ipv4Addr::new(192, 168, 1, 23));
        assert_eq!(hosts.len(), 253);
        assert!(!hosts.contains(&"192.168.1.23".to_string()));
        assert!(hosts.contains(&"192.168.1.1".to_string()));
        assert!(hosts.contains(&"192.168.1.254".to_string()));
    }

    #[tokio::test]
    async fn test_sweep_runs_only_when_multicast_is_empty() {
        let swept = AtomicBool::new(false);
        let result = fallback(HashSet::new(), || async {
            swept.store(true, Ordering::SeqCst);
            HashSet::from(["10.0.0.9".to_string()])
        })
        .await;
        assert!(swept.load(Ordering::SeqCst));
        assert!(result.contains("10.0.0.9"));

        let swept = AtomicBool::new(false);
        let multicast = HashSet::from(["10.0.0.5".to_string()]);
        let result = fallback(multicast.clone(), || async {
            swept.store(true, Ordering::SeqCst);
            HashSet::new()
        })
        .await;
        assert!(!swept.load(Ordering::SeqCst));
        assert_eq!(result, multicast);
    }
}
