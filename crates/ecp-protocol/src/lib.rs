//! External Control Protocol (ECP) client
//!
//! Wire-level access to Roku-class media players: command paths,
//! device-info parsing, and an HTTP transport with bounded timeouts.

pub mod commands;
pub mod transport;
pub mod types;

pub use commands::Command;
pub use transport::{EcpClient, EcpTransport};
pub use types::{DeviceInfo, PowerState, ECP_PORT, PLACEHOLDER_NAME};
