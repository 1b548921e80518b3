//! Periodic state refresh.
//!
//! Two tasks on independent intervals, both under one [`JoinSet`]:
//!
//! - music refresh: music state, then presence if configured
//! - battery refresh: battery level, failure handled per [`BatteryFailurePolicy`]
//!
//! Ticks fire immediately on start. A tick that falls due while the previous
//! one is still running is skipped, not queued up.

use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BatteryFailurePolicy;
use crate::host::BatteryError;

use super::state::StatePublisher;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("battery refresh failed: {0}")]
    Battery(#[from] BatteryError),

    #[error("refresh task stopped unexpectedly: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: &'static str,
    pub interval: Duration,
}

impl ScheduledTask {
    pub fn music(interval: Duration) -> Self {
        Self {
            name: "music-refresh",
            interval,
        }
    }

    pub fn battery(interval: Duration) -> Self {
        Self {
            name: "battery-refresh",
            interval,
        }
    }

    fn ticker(&self) -> tokio::time::Interval {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }
}

pub struct Scheduler {
    state: StatePublisher,
    music: ScheduledTask,
    battery: ScheduledTask,
    battery_policy: BatteryFailurePolicy,
}

impl Scheduler {
    pub fn new(
        state: StatePublisher,
        music: ScheduledTask,
        battery: ScheduledTask,
        battery_policy: BatteryFailurePolicy,
    ) -> Self {
        Self {
            state,
            music,
            battery,
            battery_policy,
        }
    }

    /// Runs both refresh tasks until `shutdown` fires or one of them fails.
    ///
    /// # Errors
    ///
    /// A battery failure under [`BatteryFailurePolicy::Fatal`], or a task
    /// that panicked. The remaining task is aborted before returning.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SchedulerError> {
        info!(
            "Starting refresh tasks: {} every {:?}, {} every {:?}",
            self.music.name, self.music.interval, self.battery.name, self.battery.interval
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(music_loop(self.state.clone(), self.music, shutdown.clone()));
        tasks.spawn(battery_loop(
            self.state,
            self.battery,
            self.battery_policy,
            shutdown,
        ));

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok(Ok(name)) => {
                    debug!("{} stopped", name);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => SchedulerError::TaskFailed(e.to_string()),
            };
            error!("{}", failure);
            tasks.shutdown().await;
            return Err(failure);
        }
        Ok(())
    }
}

async fn music_loop(
    state: StatePublisher,
    task: ScheduledTask,
    shutdown: CancellationToken,
) -> Result<&'static str, SchedulerError> {
    let mut ticker = task.ticker();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(task.name),
            _ = ticker.tick() => {}
        }
        // Failures are logged inside the publisher; the next tick retries.
        let _ = state.publish_music().await;
        let _ = state.publish_presence().await;
    }
}

async fn battery_loop(
    state: StatePublisher,
    task: ScheduledTask,
    policy: BatteryFailurePolicy,
    shutdown: CancellationToken,
) -> Result<&'static str, SchedulerError> {
    let mut ticker = task.ticker();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(task.name),
            _ = ticker.tick() => {}
        }
        if let Err(e) = state.publish_battery().await {
            match policy {
                BatteryFailurePolicy::Fatal => return Err(e.into()),
                BatteryFailurePolicy::Log => warn!("Failed to read battery: {}", e),
            }
        }
    }
}
