//! Concurrent command fan-out
//!
//! One command, N devices, per-device success accounting. Power
//! commands maintain the suppression flags as a side effect.

use crate::registry::DeviceRegistry;
use ecp_protocol::{Command, EcpClient};
use futures::future::join_all;
use std::sync::Arc;

/// Per-dispatch success accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sends that returned 2xx
    pub ok: usize,
    /// Addresses attempted, malformed entries included
    pub total: usize,
}

/// Fans a single command out to a list of addresses
pub struct Dispatcher<C> {
    client: Arc<C>,
    registry: Arc<DeviceRegistry>,
}

impl<C: EcpClient> Dispatcher<C> {
    #[must_use]
    pub fn new(client: Arc<C>, registry: Arc<DeviceRegistry>) -> Self {
        Self { client, registry }
    }

    /// Send `command` to every address concurrently
    ///
    /// An empty list is a reported no-op, not an error. Completes only
    /// once every send has returned; there is no early exit on failure
    /// and no cross-device ordering.
    pub async fn send_to_all(&self, addresses: &[String], command: &Command) -> DispatchReport {
        let total = addresses.len();
        if total == 0 {
            tracing::info!("Dispatch of {} skipped: no devices", command.path());
            return DispatchReport { ok: 0, total: 0 };
        }

        let sends = addresses.iter().map(|address| self.send_one(address, command));
        let ok = join_all(sends).await.into_iter().filter(|ok| *ok).count();

        tracing::info!("{} → {}/{} succeeded", command.label(), ok, total);
        self.registry
            .note(format!("{} → {}/{} succeeded", command.label(), ok, total));

        DispatchReport { ok, total }
    }

    async fn send_one(&self, address: &str, command: &Command) -> bool {
        let address = address.trim();
        // Anything without a dot cannot be an IPv4-style address
        if address.is_empty() || !address.contains('.') {
            tracing::warn!("Skipping malformed address {:?}", address);
            return false;
        }

        let ok = self.client.send(address, command).await;
        if ok {
            // Only explicit power commands touch the suppression flag
            if command.is_power_off() {
                self.registry.suppress(address);
            } else if command.is_power_on() {
                self.registry.clear_suppression(address);
            }
            self.registry.note(format!("{} → {}", command.label(), address));
        } else {
            tracing::warn!("{} failed → {}", command.label(), address);
            self.registry
                .note(format!("{} failed → {}", command.label(), address));
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use ecp_protocol::{DeviceInfo, PowerState};
    use std::sync::Mutex;

    /// Scripted client: unknown addresses fail, every call is recorded
    #[derive(Default)]
    struct MockClient {
        responses: DashMap<String, bool>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl MockClient {
        fn respond(&self, address: &str, ok: bool) {
            self.responses.insert(address.to_string(), ok);
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl EcpClient for MockClient {
        async fn send(&self, address: &str, command: &Command) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), command.path()));
            self.responses.get(address).is_some_and(|ok| *ok)
        }

        async fn device_info(&self, _address: &str) -> Option<DeviceInfo> {
            None
        }

        async fn power_state(&self, _address: &str) -> Option<PowerState> {
            None
        }

        async fn probe(&self, _address: &str) -> bool {
            false
        }
    }

    fn make_dispatcher() -> (Arc<MockClient>, Arc<DeviceRegistry>, Dispatcher<MockClient>) {
        let client = Arc::new(MockClient::default());
        let registry = Arc::new(DeviceRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&client), Arc::clone(&registry));
        (client, registry, dispatcher)
    }

    #[tokio::test]
    async fn test_empty_list_is_a_reported_noop() {
        let (client, _, dispatcher) = make_dispatcher();
        let report = dispatcher.send_to_all(&[], &Command::PowerOn).await;
        assert_eq!(report, DispatchReport { ok: 0, total: 0 });
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_addresses_fail_without_network_calls() {
        let (client, _, dispatcher) = make_dispatcher();
        let addresses = vec!["not-an-address".to_string(), "   ".to_string()];
        let report = dispatcher.send_to_all(&addresses, &Command::PowerOn).await;
        assert_eq!(report, DispatchReport { ok: 0, total: 2 });
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_addresses_are_trimmed_before_dispatch() {
        let (client, _, dispatcher) = make_dispatcher();
        client.respond("10.0.0.5", true);
        let addresses = vec!["  10.0.0.5 ".to_string()];
        let report = dispatcher
            .send_to_all(&addresses, &Command::Keypress("Home".into()))
            .await;
        assert_eq!(report.ok, 1);
        assert_eq!(client.sent(), vec![("10.0.0.5".to_string(), "keypress/Home".to_string())]);
    }

    #[tokio::test]
    async fn test_power_off_sets_suppression_on_success() {
        let (client, registry, dispatcher) = make_dispatcher();
        client.respond("10.0.0.5", true);
        dispatcher
            .send_to_all(&["10.0.0.5".to_string()], &Command::PowerOff)
            .await;
        assert!(registry.is_suppressed("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_launch_never_touches_suppression() {
        let (client, registry, dispatcher) = make_dispatcher();
        client.respond("10.0.0.5", true);
        registry.suppress("10.0.0.5");
        dispatcher
            .send_to_all(&["10.0.0.5".to_string()], &Command::Launch("37835".into()))
            .await;
        assert!(registry.is_suppressed("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_mixed_outcome_power_on() {
        // 10.0.0.5 answers 200, 10.0.0.6 times out
        let (client, registry, dispatcher) = make_dispatcher();
        client.respond("10.0.0.5", true);
        registry.suppress("10.0.0.5");
        registry.suppress("10.0.0.6");

        let addresses = vec!["10.0.0.5".to_string(), "10.0.0.6".to_string()];
        let report = dispatcher.send_to_all(&addresses, &Command::PowerOn).await;

        assert_eq!(report, DispatchReport { ok: 1, total: 2 });
        assert!(!registry.is_suppressed("10.0.0.5"));
        // Failed send leaves the flag untouched
        assert!(registry.is_suppressed("10.0.0.6"));
    }
}
