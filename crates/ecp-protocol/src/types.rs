//! Types parsed from the ECP status endpoint

use serde::{Deserialize, Serialize};

/// Port the ECP HTTP server listens on
pub const ECP_PORT: u16 = 8060;

/// Display name used when a device does not report one
pub const PLACEHOLDER_NAME: &str = "Roku Device";

/// Power mode reported by a device, as a momentary read
///
/// Never persisted as truth; absence of a response and an unrecognized
/// token are both treated as "not confirmed on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    DisplayOff,
    Unknown,
}

impl PowerState {
    /// Map a `power-mode` token (case-insensitive) to a state
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "poweron" => Self::On,
            "poweroff" => Self::Off,
            "displayoff" => Self::DisplayOff,
            _ => Self::Unknown,
        }
    }

    /// True only when the device is confirmed fully on
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Identity fields extracted from a `query/device-info` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Friendly device name, or [`PLACEHOLDER_NAME`] if absent
    pub name: String,
    /// Reported power mode, [`PowerState::Unknown`] if absent
    pub power: PowerState,
}

impl DeviceInfo {
    /// Parse a device-info markup body
    ///
    /// Extraction degrades instead of failing: missing or unrecognized
    /// markers yield the placeholder name and `Unknown` power state.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let name = extract_tag(body, "friendly-device-name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| PLACEHOLDER_NAME.to_string(), str::to_string);

        let power = extract_tag(body, "power-mode")
            .map_or(PowerState::Unknown, PowerState::from_token);

        Self { name, power }
    }
}

/// Find the text between `<tag>` and `</tag>`, matching tags case-insensitively
fn extract_tag<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let lower = body.to_ascii_lowercase();
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = lower.find(&open)? + open.len();
    let end = lower[start..].find(&close)? + start;
    Some(&body[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "<device-info>\
        <friendly-device-name>Lobby TV</friendly-device-name>\
        <power-mode>PowerOn</power-mode>\
        </device-info>";

    #[test]
    fn test_parse_full_body() {
        let info = DeviceInfo::parse(BODY);
        assert_eq!(info.name, "Lobby TV");
        assert_eq!(info.power, PowerState::On);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let body = "<FRIENDLY-DEVICE-NAME> Bar TV </FRIENDLY-DEVICE-NAME>\
                    <Power-Mode>DISPLAYOFF</Power-Mode>";
        let info = DeviceInfo::parse(body);
        assert_eq!(info.name, "Bar TV");
        assert_eq!(info.power, PowerState::DisplayOff);
    }

    #[test]
    fn test_parse_missing_markers_degrades() {
        let info = DeviceInfo::parse("<device-info></device-info>");
        assert_eq!(info.name, PLACEHOLDER_NAME);
        assert_eq!(info.power, PowerState::Unknown);
    }

    #[test]
    fn test_power_tokens() {
        assert_eq!(PowerState::from_token("PowerOn"), PowerState::On);
        assert_eq!(PowerState::from_token(" poweroff "), PowerState::Off);
        assert_eq!(PowerState::from_token("DisplayOff"), PowerState::DisplayOff);
        assert_eq!(PowerState::from_token("Ready"), PowerState::Unknown);
        assert!(!PowerState::DisplayOff.is_on());
        assert!(PowerState::On.is_on());
    }
}
