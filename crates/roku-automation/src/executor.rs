//! Job executor
//!
//! Runs exactly one firing of a schedule unit and returns the delay to
//! the next one, so the chain is never broken by a failed send.

use crate::model::{
    next_daily_delay, relaunch_decision, DailyKind, RelaunchDecision, ScheduleUnit,
};
use chrono::Local;
use ecp_protocol::{Command, EcpClient};
use roku_core::DeviceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Send attempts per firing before the outcome is treated as failed
pub const RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff between attempts, doubled after each failure
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// User-visible signals for the host's toast/notification surface
#[derive(Debug, Clone)]
pub enum AutomationEvent {
    /// A relaunch cycle found the device off and sent nothing
    RelaunchSkipped { address: String },
    /// A relaunch cycle sent the launch command
    RelaunchExecuted { address: String, ok: bool },
    /// A daily power job fired
    DailyExecuted {
        address: String,
        kind: DailyKind,
        ok: bool,
    },
}

/// Executes single firings against the transport and registry
pub struct JobExecutor<C> {
    client: Arc<C>,
    registry: Arc<DeviceRegistry>,
    event_tx: broadcast::Sender<AutomationEvent>,
}

impl<C: EcpClient> JobExecutor<C> {
    pub fn new(
        client: Arc<C>,
        registry: Arc<DeviceRegistry>,
        event_tx: broadcast::Sender<AutomationEvent>,
    ) -> Self {
        Self {
            client,
            registry,
            event_tx,
        }
    }

    /// Run one firing, returning the delay until the next
    ///
    /// The reschedule is unconditional: terminal send failure is a
    /// logged, user-notified event, never a break in the chain.
    pub async fn run_once(&self, unit: &ScheduleUnit) -> Duration {
        match unit {
            ScheduleUnit::Relaunch {
                address,
                interval,
                app_id,
            } => {
                self.run_relaunch(address, app_id).await;
                *interval
            }
            ScheduleUnit::Daily { address, kind, at } => {
                self.run_daily(address, *kind).await;
                next_daily_delay(Local::now().naive_local(), at.as_naive())
            }
        }
    }

    async fn run_relaunch(&self, address: &str, app_id: &str) {
        let suppressed = self.registry.is_suppressed(address);
        // Only re-poll the device when the flag says it should be off
        let live = if suppressed {
            self.client.power_state(address).await
        } else {
            None
        };

        match relaunch_decision(suppressed, live) {
            RelaunchDecision::Skip => {
                let msg = format!("Skipped relaunch on {address} (device is off)");
                tracing::info!("{}", msg);
                self.registry.note(msg);
                let _ = self.event_tx.send(AutomationEvent::RelaunchSkipped {
                    address: address.to_string(),
                });
                return;
            }
            RelaunchDecision::ResumeAndLaunch => {
                // Came back on outside an explicit power-on (remote,
                // daily job on another controller, ...)
                tracing::info!("{} observed back on, resuming relaunch", address);
                self.registry.clear_suppression(address);
            }
            RelaunchDecision::Launch => {}
        }

        let command = Command::Launch(app_id.to_string());
        let ok = self.send_with_retry(address, &command).await;
        let msg = if ok {
            format!("Auto relaunch on {address}")
        } else {
            format!("Auto relaunch failed on {address}")
        };
        if ok {
            tracing::info!("{}", msg);
        } else {
            tracing::warn!("{}", msg);
        }
        self.registry.note(msg);
        let _ = self.event_tx.send(AutomationEvent::RelaunchExecuted {
            address: address.to_string(),
            ok,
        });
    }

    async fn run_daily(&self, address: &str, kind: DailyKind) {
        let command = kind.command();
        let ok = self.send_with_retry(address, &command).await;

        // Maintain suppression exactly like a directed dispatch would
        if ok {
            match kind {
                DailyKind::Off => self.registry.suppress(address),
                DailyKind::On => self.registry.clear_suppression(address),
            }
        }

        let msg = if ok {
            format!("{} → {address}", command.label())
        } else {
            format!("{} failed → {address}", command.label())
        };
        if ok {
            tracing::info!("{}", msg);
        } else {
            tracing::warn!("{}", msg);
        }
        self.registry.note(msg);
        let _ = self.event_tx.send(AutomationEvent::DailyExecuted {
            address: address.to_string(),
            kind,
            ok,
        });
    }

    /// Bounded retry with doubling backoff, standing in for a host job
    /// substrate's retry-then-report behavior
    async fn send_with_retry(&self, address: &str, command: &Command) -> bool {
        let mut backoff = RETRY_BACKOFF;
        for attempt in 1..=RETRY_ATTEMPTS {
            if self.client.send(address, command).await {
                return true;
            }
            if attempt < RETRY_ATTEMPTS {
                tracing::debug!(
                    "Attempt {}/{} of {} on {} failed, retrying in {:?}",
                    attempt,
                    RETRY_ATTEMPTS,
                    command.path(),
                    address,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        tracing::warn!(
            "{} on {} failed after {} attempts",
            command.path(),
            address,
            RETRY_ATTEMPTS
        );
        false
    }
}
