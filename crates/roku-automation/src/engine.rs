//! Automation engine facade
//!
//! The surface the UI layer talks to: enable/disable the two automation
//! kinds, persist the intent, and re-arm it after a restart.

use crate::error::AutomationError;
use crate::executor::AutomationEvent;
use crate::model::{
    AutomationSettings, DailyKind, ScheduleUnit, TimeOfDay, MIN_INTERVAL_SECS,
};
use crate::persistence;
use crate::scheduler::Scheduler;
use ecp_protocol::EcpClient;
use roku_core::DeviceRegistry;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// The main automation engine
pub struct AutomationEngine<C> {
    scheduler: Scheduler<C>,
    registry: Arc<DeviceRegistry>,
    /// Persisted intent, guarded for mixed interactive/background access
    settings: Mutex<AutomationSettings>,
    /// Path for persistence
    data_path: PathBuf,
}

impl<C: EcpClient> AutomationEngine<C> {
    /// Create an engine, loading any persisted settings
    pub async fn new(client: Arc<C>, registry: Arc<DeviceRegistry>, data_dir: &Path) -> Self {
        let data_path = data_dir.join("automation.json");
        let settings = persistence::load_settings(&data_path).await;
        Self {
            scheduler: Scheduler::new(client, Arc::clone(&registry)),
            registry,
            settings: Mutex::new(settings),
            data_path,
        }
    }

    /// Subscribe to user-visible automation events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.scheduler.subscribe()
    }

    /// Current persisted settings
    #[must_use]
    pub fn settings(&self) -> AutomationSettings {
        self.settings.lock().expect("settings lock").clone()
    }

    /// Start a relaunch chain for every address
    ///
    /// The interval is clamped to at least one second. An empty address
    /// list records the intent without scheduling anything.
    pub async fn enable_relaunch(
        &self,
        interval_secs: u64,
        addresses: &[String],
        app_id: &str,
    ) -> Result<(), AutomationError> {
        let interval_secs = interval_secs.max(MIN_INTERVAL_SECS);
        let interval = Duration::from_secs(interval_secs);

        for address in addresses {
            self.scheduler.schedule(ScheduleUnit::Relaunch {
                address: address.clone(),
                interval,
                app_id: app_id.to_string(),
            });
        }

        {
            let mut settings = self.settings.lock().expect("settings lock");
            settings.relaunch_enabled = true;
            settings.interval_secs = interval_secs;
            settings.app_id = Some(app_id.to_string());
        }
        self.save().await
    }

    /// Cancel every relaunch chain
    pub async fn disable_relaunch(&self) -> Result<(), AutomationError> {
        self.scheduler
            .cancel_kind(crate::model::ScheduleKind::RelaunchInterval);
        self.settings.lock().expect("settings lock").relaunch_enabled = false;
        self.save().await
    }

    /// Schedule a daily power command for every address
    pub async fn enable_daily(
        &self,
        kind: DailyKind,
        hour: u32,
        minute: u32,
        addresses: &[String],
    ) -> Result<(), AutomationError> {
        let at = TimeOfDay::new(hour, minute)?;

        for address in addresses {
            self.scheduler.schedule(ScheduleUnit::Daily {
                address: address.clone(),
                kind,
                at,
            });
        }

        {
            let mut settings = self.settings.lock().expect("settings lock");
            match kind {
                DailyKind::On => {
                    settings.daily_on_enabled = true;
                    settings.daily_on = Some(at);
                }
                DailyKind::Off => {
                    settings.daily_off_enabled = true;
                    settings.daily_off = Some(at);
                }
            }
        }
        self.save().await
    }

    /// Cancel every daily job of one kind
    pub async fn disable_daily(&self, kind: DailyKind) -> Result<(), AutomationError> {
        self.scheduler.cancel_kind(kind.schedule_kind());
        {
            let mut settings = self.settings.lock().expect("settings lock");
            match kind {
                DailyKind::On => settings.daily_on_enabled = false,
                DailyKind::Off => settings.daily_off_enabled = false,
            }
        }
        self.save().await
    }

    /// Re-arm every enabled automation for the registry's devices
    ///
    /// Called after a restart; persisted intent plus re-arm stands in
    /// for a durable OS scheduling substrate.
    pub async fn restore(&self) -> Result<(), AutomationError> {
        let settings = self.settings();
        let addresses = self.registry.addresses();

        if settings.relaunch_enabled {
            if let Some(app_id) = &settings.app_id {
                self.enable_relaunch(settings.interval_secs, &addresses, app_id)
                    .await?;
            }
        }
        if settings.daily_on_enabled {
            if let Some(at) = settings.daily_on {
                self.enable_daily(DailyKind::On, at.hour, at.minute, &addresses)
                    .await?;
            }
        }
        if settings.daily_off_enabled {
            if let Some(at) = settings.daily_off {
                self.enable_daily(DailyKind::Off, at.hour, at.minute, &addresses)
                    .await?;
            }
        }

        tracing::info!("Restored automations for {} device(s)", addresses.len());
        Ok(())
    }

    /// Number of active timer jobs (all kinds)
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Number of active timer jobs of one kind
    #[must_use]
    pub fn active_jobs_of(&self, kind: crate::model::ScheduleKind) -> usize {
        self.scheduler.active_count_of(kind)
    }

    async fn save(&self) -> Result<(), AutomationError> {
        let settings = self.settings();
        persistence::save_settings(&self.data_path, &settings).await?;
        Ok(())
    }
}
