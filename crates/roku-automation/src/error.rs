//! Error types for the automation engine

use thiserror::Error;

/// Errors that can occur in the automation engine
///
/// Network failure is not represented here; it is absorbed at the
/// transport boundary and surfaces as per-device boolean outcomes.
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Hour/minute outside the 24-hour clock
    #[error("Invalid time of day: {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    /// IO error (persistence)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
