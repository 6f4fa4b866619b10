//! Shared device and suppression state
//!
//! The registry is the keyed state service injected into the dispatcher
//! and the automation engine; it is the only place suppression flags and
//! the device list live.

use crate::device::RokuDevice;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum entries kept in the rolling activity log
pub const ACTIVITY_LOG_CAP: usize = 200;

/// Serializable snapshot of the registry for persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub devices: Vec<RokuDevice>,
    #[serde(default)]
    pub suppressed: Vec<String>,
    #[serde(default)]
    pub activity: Vec<String>,
}

/// Device list, per-device suppression flags, and a bounded activity log
///
/// Suppression invariant: a device with the flag set is assumed off
/// until a power-on is dispatched to it or a relaunch check observes it
/// live-on.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    /// Known devices, keyed by address
    devices: DashMap<String, RokuDevice>,
    /// Addresses currently assumed powered off
    suppressed: DashSet<String>,
    /// Rolling user-visible log, newest last
    activity: Mutex<VecDeque<String>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a persisted snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let registry = Self::new();
        for device in snapshot.devices {
            registry.devices.insert(device.address.clone(), device);
        }
        for address in snapshot.suppressed {
            registry.suppressed.insert(address);
        }
        let mut activity = registry.activity.lock().expect("activity lock");
        activity.extend(snapshot.activity);
        // A stale or hand-edited snapshot may exceed the cap; keep the
        // newest entries
        while activity.len() > ACTIVITY_LOG_CAP {
            activity.pop_front();
        }
        drop(activity);
        registry
    }

    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            devices: self.list(),
            suppressed: self.suppressed.iter().map(|a| a.key().clone()).collect(),
            activity: self.recent(),
        }
    }

    /// Add a device; returns false (keeping the existing entry) if the
    /// address is already known
    pub fn add_device(&self, device: RokuDevice) -> bool {
        if self.devices.contains_key(&device.address) {
            return false;
        }
        tracing::info!("Added device {} ({})", device.display_name(), device.address);
        self.devices.insert(device.address.clone(), device);
        true
    }

    /// Remove a device and its suppression flag
    pub fn remove_device(&self, address: &str) -> Option<RokuDevice> {
        self.suppressed.remove(address);
        let removed = self.devices.remove(address).map(|(_, device)| device);
        if removed.is_some() {
            tracing::info!("Removed device {}", address);
        }
        removed
    }

    /// Rename a known device; returns false if the address is unknown
    pub fn rename(&self, address: &str, name: &str) -> bool {
        match self.devices.get_mut(address) {
            Some(mut device) => {
                device.name = name.trim().to_string();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, address: &str) -> Option<RokuDevice> {
        self.devices.get(address).map(|d| d.value().clone())
    }

    #[must_use]
    pub fn list(&self) -> Vec<RokuDevice> {
        self.devices.iter().map(|d| d.value().clone()).collect()
    }

    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.key().clone()).collect()
    }

    /// Merge discovery results into the device list
    ///
    /// Union by address: an already-known address keeps its existing
    /// (possibly user-given) name. Returns the number of new devices.
    pub fn merge_discovered(&self, found: Vec<RokuDevice>) -> usize {
        let mut added = 0;
        for device in found {
            if self.add_device(device) {
                added += 1;
            }
        }
        added
    }

    /// Mark a device as assumed off
    pub fn suppress(&self, address: &str) {
        if self.suppressed.insert(address.to_string()) {
            tracing::debug!("Suppression set for {}", address);
        }
    }

    /// Clear the assumed-off flag
    pub fn clear_suppression(&self, address: &str) {
        if self.suppressed.remove(address).is_some() {
            tracing::debug!("Suppression cleared for {}", address);
        }
    }

    #[must_use]
    pub fn is_suppressed(&self, address: &str) -> bool {
        self.suppressed.contains(address)
    }

    /// Append a line to the rolling activity log, dropping the oldest
    /// entry past the cap
    pub fn note(&self, message: impl Into<String>) {
        let mut activity = self.activity.lock().expect("activity lock");
        while activity.len() >= ACTIVITY_LOG_CAP {
            activity.pop_front();
        }
        activity.push_back(message.into());
    }

    /// Current activity log, oldest first
    #[must_use]
    pub fn recent(&self) -> Vec<String> {
        let activity = self.activity.lock().expect("activity lock");
        activity.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent_by_address() {
        let registry = DeviceRegistry::new();
        assert!(registry.add_device(RokuDevice::new("10.0.0.5", "Lobby TV")));
        assert!(!registry.add_device(RokuDevice::new("10.0.0.5", "Other")));
        assert_eq!(registry.get("10.0.0.5").unwrap().name, "Lobby TV");
    }

    #[test]
    fn test_merge_preserves_user_names() {
        let registry = DeviceRegistry::new();
        registry.add_device(RokuDevice::new("10.0.0.5", "Front Desk"));

        let added = registry.merge_discovered(vec![
            RokuDevice::new("10.0.0.5", "Roku Device"),
            RokuDevice::new("10.0.0.6", "Bar TV"),
        ]);

        assert_eq!(added, 1);
        assert_eq!(registry.get("10.0.0.5").unwrap().name, "Front Desk");
        assert_eq!(registry.get("10.0.0.6").unwrap().name, "Bar TV");
    }

    #[test]
    fn test_suppression_flags() {
        let registry = DeviceRegistry::new();
        assert!(!registry.is_suppressed("10.0.0.5"));
        registry.suppress("10.0.0.5");
        assert!(registry.is_suppressed("10.0.0.5"));
        registry.clear_suppression("10.0.0.5");
        assert!(!registry.is_suppressed("10.0.0.5"));
    }

    #[test]
    fn test_remove_clears_suppression() {
        let registry = DeviceRegistry::new();
        registry.add_device(RokuDevice::new("10.0.0.5", "TV"));
        registry.suppress("10.0.0.5");
        registry.remove_device("10.0.0.5");
        assert!(!registry.is_suppressed("10.0.0.5"));
        assert!(registry.get("10.0.0.5").is_none());
    }

    #[test]
    fn test_activity_log_is_bounded() {
        let registry = DeviceRegistry::new();
        for i in 0..(ACTIVITY_LOG_CAP + 10) {
            registry.note(format!("entry {i}"));
        }
        let recent = registry.recent();
        assert_eq!(recent.len(), ACTIVITY_LOG_CAP);
        assert_eq!(recent[0], "entry 10");
    }

    #[test]
    fn test_oversized_snapshot_log_is_truncated_to_newest() {
        let snapshot = RegistrySnapshot {
            devices: Vec::new(),
            suppressed: Vec::new(),
            activity: (0..(ACTIVITY_LOG_CAP + 20)).map(|i| format!("entry {i}")).collect(),
        };
        let registry = DeviceRegistry::from_snapshot(snapshot);

        let recent = registry.recent();
        assert_eq!(recent.len(), ACTIVITY_LOG_CAP);
        assert_eq!(recent[0], "entry 20");

        // The cap holds for appends after the restore too
        registry.note("one more");
        let recent = registry.recent();
        assert_eq!(recent.len(), ACTIVITY_LOG_CAP);
        assert_eq!(recent.last().unwrap(), "one more");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let registry = DeviceRegistry::new();
        registry.add_device(RokuDevice::new("10.0.0.5", "TV"));
        registry.suppress("10.0.0.5");
        registry.note("Power Off → 10.0.0.5");

        let restored = DeviceRegistry::from_snapshot(registry.snapshot());
        assert_eq!(restored.get("10.0.0.5").unwrap().name, "TV");
        assert!(restored.is_suppressed("10.0.0.5"));
        assert_eq!(restored.recent(), vec!["Power Off → 10.0.0.5".to_string()]);
    }
}
