//! Keyed one-shot timer jobs
//!
//! The generic "run after delay, keyed, replace-on-conflict" primitive.
//! Each schedule unit runs as one tokio task that sleeps, executes once
//! via the executor, and re-derives its next delay from the outcome,
//! forming a self-sustaining chain broken only by a cancel.

use crate::executor::{AutomationEvent, JobExecutor};
use crate::model::{ScheduleKind, ScheduleUnit, UnitKey};
use chrono::Local;
use dashmap::DashMap;
use ecp_protocol::EcpClient;
use roku_core::DeviceRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Scheduler driving per-(kind, device) timer chains
pub struct Scheduler<C> {
    /// Active timer handles, one per unit key
    timers: Arc<DashMap<UnitKey, JoinHandle<()>>>,
    executor: Arc<JobExecutor<C>>,
    event_tx: broadcast::Sender<AutomationEvent>,
}

impl<C: EcpClient> Scheduler<C> {
    #[must_use]
    pub fn new(client: Arc<C>, registry: Arc<DeviceRegistry>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let executor = Arc::new(JobExecutor::new(client, registry, event_tx.clone()));
        Self {
            timers: Arc::new(DashMap::new()),
            executor,
            event_tx,
        }
    }

    /// Subscribe to user-visible automation events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.event_tx.subscribe()
    }

    /// Start (or replace) the chain for a unit
    ///
    /// An existing job with the same key is aborted first: two pending
    /// jobs per key would double-fire.
    pub fn schedule(&self, unit: ScheduleUnit) {
        let key = unit.key();
        let executor = Arc::clone(&self.executor);
        let delay = unit.initial_delay(Local::now().naive_local());
        let handle = tokio::spawn(async move {
            let mut delay = delay;
            loop {
                tokio::time::sleep(delay).await;
                delay = executor.run_once(&unit).await;
            }
        });

        tracing::info!(
            "Scheduled {:?} for {} (first firing in {:?})",
            key.kind,
            key.address,
            delay
        );
        // Abort whatever the insert displaced: a displaced handle that
        // is merely dropped would keep its chain firing, invisible to
        // cancel_kind
        if let Some(old) = self.timers.insert(key.clone(), handle) {
            old.abort();
            tracing::debug!("Replaced pending {:?} job for {}", key.kind, key.address);
        }
    }

    /// Cancel every job tagged with `kind`, across all devices
    ///
    /// Best-effort with respect to in-flight executions: last operation
    /// wins.
    pub fn cancel_kind(&self, kind: ScheduleKind) -> usize {
        let keys: Vec<UnitKey> = self
            .timers
            .iter()
            .filter(|entry| entry.key().kind == kind)
            .map(|entry| entry.key().clone())
            .collect();

        for key in &keys {
            if let Some((_, handle)) = self.timers.remove(key) {
                handle.abort();
            }
        }

        tracing::info!("Canceled {} {:?} job(s)", keys.len(), kind);
        keys.len()
    }

    /// Number of active timer jobs
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Number of active timer jobs of one kind
    #[must_use]
    pub fn active_count_of(&self, kind: ScheduleKind) -> usize {
        self.timers
            .iter()
            .filter(|entry| entry.key().kind == kind)
            .count()
    }
}

impl<C> Drop for Scheduler<C> {
    fn drop(&mut self) {
        // Abort all timer tasks
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}
