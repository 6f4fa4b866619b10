//! ECP command paths
//!
//! A command is stateless from the transport's point of view; the
//! power-off/power-on suppression bookkeeping is layered on top by the
//! dispatcher and the automation engine.

use std::fmt;

/// A command understood by the ECP endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `keypress/PowerOn`
    PowerOn,
    /// `keypress/PowerOff`
    PowerOff,
    /// `launch/{app_id}`: bring an installed channel to the foreground
    Launch(String),
    /// `keypress/{key}`: any other remote key (Home, Up, Select, ...)
    Keypress(String),
}

impl Command {
    /// URL path segment appended to `http://{ip}:8060/`
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::PowerOn => "keypress/PowerOn".to_string(),
            Self::PowerOff => "keypress/PowerOff".to_string(),
            Self::Launch(app_id) => format!("launch/{app_id}"),
            Self::Keypress(key) => format!("keypress/{key}"),
        }
    }

    /// Short label for user-facing messages
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::PowerOn => "Power On".to_string(),
            Self::PowerOff => "Power Off".to_string(),
            Self::Launch(_) => "Launch".to_string(),
            Self::Keypress(key) => key.clone(),
        }
    }

    #[must_use]
    pub fn is_power_on(&self) -> bool {
        matches!(self, Self::PowerOn)
    }

    #[must_use]
    pub fn is_power_off(&self) -> bool {
        matches!(self, Self::PowerOff)
    }

    #[must_use]
    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_paths() {
        assert_eq!(Command::PowerOn.path(), "keypress/PowerOn");
        assert_eq!(Command::PowerOff.path(), "keypress/PowerOff");
        assert_eq!(Command::Launch("37835".into()).path(), "launch/37835");
        assert_eq!(Command::Keypress("Home".into()).path(), "keypress/Home");
    }

    #[test]
    fn test_command_predicates() {
        assert!(Command::PowerOn.is_power_on());
        assert!(Command::PowerOff.is_power_off());
        assert!(Command::Launch("1".into()).is_launch());
        assert!(!Command::Keypress("PowerOn".into()).is_power_on());
    }
}
