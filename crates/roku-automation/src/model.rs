//! Schedule model and pure decision logic
//!
//! The decision functions are kept free of I/O and timer plumbing so
//! they can be tested in isolation from the enqueue mechanism.

use crate::error::AutomationError;
use chrono::{NaiveDateTime, NaiveTime};
use ecp_protocol::{Command, PowerState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Floor for the relaunch interval
pub const MIN_INTERVAL_SECS: u64 = 1;

/// Default relaunch interval when none was ever configured
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// The automation kinds a timer job can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    RelaunchInterval,
    DailyOn,
    DailyOff,
}

/// Direction of a daily power schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyKind {
    On,
    Off,
}

impl DailyKind {
    #[must_use]
    pub fn schedule_kind(self) -> ScheduleKind {
        match self {
            Self::On => ScheduleKind::DailyOn,
            Self::Off => ScheduleKind::DailyOff,
        }
    }

    #[must_use]
    pub fn command(self) -> Command {
        match self {
            Self::On => Command::PowerOn,
            Self::Off => Command::PowerOff,
        }
    }
}

/// Identity of one automation instance: at most one live timer job per
/// key, enqueue replaces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub kind: ScheduleKind,
    pub address: String,
}

/// Wall-clock time for the daily kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    /// Validate against the 24-hour clock
    pub fn new(hour: u32, minute: u32) -> Result<Self, AutomationError> {
        if hour > 23 || minute > 59 {
            return Err(AutomationError::InvalidTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    /// Display label, e.g. "09:05"
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    #[must_use]
    pub fn as_naive(&self) -> NaiveTime {
        // Fields are validated at construction
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// One automation instance: everything a firing needs, plus what
/// re-deriving the next occurrence needs
#[derive(Debug, Clone)]
pub enum ScheduleUnit {
    Relaunch {
        address: String,
        interval: Duration,
        app_id: String,
    },
    Daily {
        address: String,
        kind: DailyKind,
        at: TimeOfDay,
    },
}

impl ScheduleUnit {
    #[must_use]
    pub fn key(&self) -> UnitKey {
        UnitKey {
            kind: self.kind(),
            address: self.address().to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ScheduleKind {
        match self {
            Self::Relaunch { .. } => ScheduleKind::RelaunchInterval,
            Self::Daily { kind, .. } => kind.schedule_kind(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Relaunch { address, .. } | Self::Daily { address, .. } => address,
        }
    }

    /// Delay before the first firing
    #[must_use]
    pub fn initial_delay(&self, now: NaiveDateTime) -> Duration {
        match self {
            Self::Relaunch { interval, .. } => *interval,
            Self::Daily { at, .. } => next_daily_delay(now, at.as_naive()),
        }
    }
}

/// Delay until the next occurrence of `at`: today if still in the
/// future, else tomorrow
#[must_use]
pub fn next_daily_delay(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut target = now.date().and_time(at);
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::from_secs(1))
}

/// What a relaunch cycle should do for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaunchDecision {
    /// Not suppressed: launch normally
    Launch,
    /// Suppressed but observed live-on: clear the flag, then launch
    ResumeAndLaunch,
    /// Suppressed and not confirmed on: skip the launch, re-poll next
    /// cycle
    Skip,
}

/// Decide a relaunch cycle from the suppression flag and a momentary
/// power read
///
/// `None` (unreachable) counts as "not confirmed on".
#[must_use]
pub fn relaunch_decision(suppressed: bool, live: Option<PowerState>) -> RelaunchDecision {
    if !suppressed {
        return RelaunchDecision::Launch;
    }
    match live {
        Some(state) if state.is_on() => RelaunchDecision::ResumeAndLaunch,
        _ => RelaunchDecision::Skip,
    }
}

/// Persisted automation intent: enabled flags, parameters, display
/// labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
    #[serde(default)]
    pub relaunch_enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub daily_on_enabled: bool,
    #[serde(default)]
    pub daily_on: Option<TimeOfDay>,
    #[serde(default)]
    pub daily_off_enabled: bool,
    #[serde(default)]
    pub daily_off: Option<TimeOfDay>,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            relaunch_enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            app_id: None,
            daily_on_enabled: false,
            daily_on: None,
            daily_off_enabled: false,
            daily_off: None,
        }
    }
}
