//! Scheduled task runtime
//!
//! Every background loop (cluster evaluation, position watchdogs) is a
//! [`ScheduledTask`]: a value with an explicit `tick`. [`run_scheduled`]
//! drives it on an interval until the task finishes, the tick budget is
//! exhausted, or shutdown is triggered. A failing tick is logged and the loop
//! carries on with the next scheduled tick.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::shutdown::ShutdownSignal;

/// What the loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking
    Continue,
    /// The task reached its goal; stop the loop
    Finished,
}

/// Failure inside one tick; never terminates the loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// A periodic unit of work
#[async_trait]
pub trait ScheduledTask: Send {
    /// Name for logging
    fn name(&self) -> &str;

    /// Run one iteration
    async fn tick(&mut self) -> Result<TickOutcome, TaskError>;

    /// Called once when the tick budget runs out before the task finished
    fn on_exhausted(&mut self) {}
}

/// When a task ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait before the first tick
    pub initial_delay: Duration,
    /// Time between ticks
    pub interval: Duration,
    /// Stop after this many ticks (None = until finished or shutdown)
    pub max_ticks: Option<u64>,
}

impl Schedule {
    /// Tick immediately, then every `interval`
    pub fn every(interval: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval,
            max_ticks: None,
        }
    }

    /// Builder: Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Builder: Cap the number of ticks
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Why a scheduled loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The task returned [`TickOutcome::Finished`]
    Finished,
    /// `max_ticks` reached first
    Exhausted,
    /// Shutdown was triggered
    Shutdown,
}

/// Summary of a finished loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub errors: u64,
    pub reason: StopReason,
}

async fn wait_for_wake(wake: &Option<Arc<Notify>>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive `task` according to `schedule`
///
/// `wake` lets another component request an early tick (for example when a
/// new signal arrives); woken ticks count against `max_ticks` like any other.
pub async fn run_scheduled<T: ScheduledTask>(
    mut task: T,
    schedule: Schedule,
    mut shutdown: ShutdownSignal,
    wake: Option<Arc<Notify>>,
) -> RunSummary {
    let mut ticks = 0u64;
    let mut errors = 0u64;

    if !schedule.initial_delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(schedule.initial_delay) => {}
            _ = shutdown.wait() => {
                debug!("[SCHEDULE] {} stopped before first tick", task.name());
                return RunSummary { ticks, errors, reason: StopReason::Shutdown };
            }
        }
    }

    let mut interval = tokio::time::interval(schedule.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if let Some(max) = schedule.max_ticks
            && ticks >= max
        {
            task.on_exhausted();
            return RunSummary {
                ticks,
                errors,
                reason: StopReason::Exhausted,
            };
        }

        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                debug!("[SCHEDULE] {} stopped by shutdown after {} ticks", task.name(), ticks);
                return RunSummary { ticks, errors, reason: StopReason::Shutdown };
            }
            _ = interval.tick() => {}
            _ = wait_for_wake(&wake) => {}
        }

        ticks += 1;
        match task.tick().await {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Finished) => {
                return RunSummary {
                    ticks,
                    errors,
                    reason: StopReason::Finished,
                };
            }
            Err(e) => {
                errors += 1;
                warn!("[SCHEDULE] {} tick {} failed: {}", task.name(), ticks, e);
            }
        }
    }
}
