//! Roku device representation

use serde::{Deserialize, Serialize};

/// A controllable device on the local network
///
/// Uniqueness key is the address; the name is mutable (user rename).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RokuDevice {
    /// IPv4 address as a string (e.g. "192.168.1.42")
    pub address: String,
    /// User-assigned or discovered friendly name
    pub name: String,
}

impl RokuDevice {
    #[must_use]
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Name for display, falling back to the address
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}
