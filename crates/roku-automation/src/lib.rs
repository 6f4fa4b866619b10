//! Power-state-aware automation for ECP device fleets
//!
//! Two automation kinds, each a self-rescheduling one-shot timer chain
//! per device: interval relaunch (suppressed while a device is known
//! off) and daily power on/off.

pub mod engine;
pub mod error;
pub mod executor;
pub mod model;
pub mod persistence;
pub mod scheduler;

pub use engine::AutomationEngine;
pub use error::AutomationError;
pub use executor::AutomationEvent;
pub use model::*;
pub use scheduler::Scheduler;
