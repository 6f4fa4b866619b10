//! Device fleet layer
//!
//! Device registry, SSDP/sweep discovery, and concurrent command
//! dispatch on top of the low-level ECP protocol.

pub mod device;
pub mod discovery;
pub mod dispatch;
pub mod persistence;
pub mod registry;

pub use device::RokuDevice;
pub use discovery::DiscoveryEngine;
pub use dispatch::{DispatchReport, Dispatcher};
pub use registry::{DeviceRegistry, RegistrySnapshot};
