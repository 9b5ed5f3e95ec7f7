//! Position Watchdog
//!
//! After an entry fills, the protective orders outlive the position: when the
//! take-profit fills the stop keeps resting, and vice versa. The watchdog
//! polls the position and, once it is flat for `confirmations` consecutive
//! readings, cancels every order left on the symbol.
//!
//! ## State machine
//!
//! ```text
//! OPENING ──(size > ε)──► OPEN ──(size ≤ ε)──► CLOSING ──(N flat)──► CLOSED
//!    │                      ▲                     │
//!    └────(size ≤ ε)────────┼─────────────────────┘
//!                           └──────(size > ε, counter reset)
//! ```
//!
//! A reading above ε resets the counter, so a transient zero mid-fill never
//! closes the watch. The tick budget bounds the watch when flatness is never
//! confirmed.

use async_trait::async_trait;
use dashmap::DashSet;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use swarm_clock::{RunSummary, Schedule, ScheduledTask, ShutdownSignal, TaskError, TickOutcome, run_scheduled};
use swarm_core::{InstrumentConstraints, PositionState, PositionWatch, Quantity, Symbol};
use swarm_gateway::RetryPolicy;
use swarm_ports::ExchangeGateway;
use tokio::task::JoinHandle;

/// Watchdog timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Wait before the first poll so the exchange registers the fill
    pub grace_delay: Duration,
    /// Time between polls
    pub poll_interval: Duration,
    /// Consecutive flat readings before cancelling
    pub confirmations: u32,
    /// Poll budget; the watch ends unresolved when it runs out
    pub max_checks: u64,
    /// Policy for each position query
    pub query_policy: RetryPolicy,
    /// Policy for the final cancel-all
    pub cancel_policy: RetryPolicy,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(10),
            confirmations: 3,
            max_checks: 8640,
            query_policy: RetryPolicy::once(Duration::from_secs(10)),
            cancel_policy: RetryPolicy::default(),
        }
    }
}

impl WatchdogConfig {
    /// Builder: Set timing
    pub fn with_timing(mut self, grace_delay: Duration, poll_interval: Duration) -> Self {
        self.grace_delay = grace_delay;
        self.poll_interval = poll_interval;
        self
    }

    /// Builder: Set poll budget
    pub fn with_max_checks(mut self, max_checks: u64) -> Self {
        self.max_checks = max_checks;
        self
    }

    /// Builder: Set confirmation count
    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::every(self.poll_interval)
            .with_initial_delay(self.grace_delay)
            .with_max_ticks(self.max_checks)
    }
}

/// Watch over one open position
pub struct PositionWatchdog {
    gateway: Arc<dyn ExchangeGateway>,
    watch: PositionWatch,
    /// Sizes at or below this count as flat
    epsilon: Quantity,
    config: WatchdogConfig,
    name: String,
}

impl PositionWatchdog {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        symbol: impl Into<Symbol>,
        constraints: &InstrumentConstraints,
        config: WatchdogConfig,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            gateway,
            name: format!("watchdog-{}", symbol),
            watch: PositionWatch::new(symbol),
            epsilon: constraints.flat_epsilon(),
            config,
        }
    }

    pub fn state(&self) -> PositionState {
        self.watch.state
    }

    async fn cancel_residual_orders(&mut self) -> Result<TickOutcome, TaskError> {
        let symbol = self.watch.symbol.clone();
        let gateway = self.gateway.clone();
        self.config
            .cancel_policy
            .run("cancel_all_orders", || gateway.cancel_all_orders(&symbol))
            .await
            .map_err(|e| TaskError::new(format!("cancel-all on {} failed: {}", symbol, e)))?;

        self.watch.mark_closed();
        info!("[WATCHDOG] {} closed, residual orders cancelled", symbol);
        Ok(TickOutcome::Finished)
    }
}

#[async_trait]
impl ScheduledTask for PositionWatchdog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&mut self) -> Result<TickOutcome, TaskError> {
        let gateway = self.gateway.clone();
        let symbol = self.watch.symbol.clone();
        let size = self
            .config
            .query_policy
            .run("get_position_size", || gateway.get_position_size(&symbol))
            .await
            .map_err(|e| TaskError::new(format!("position query on {} failed: {}", symbol, e)))?;

        if size > self.epsilon {
            if self.watch.consecutive_flat_checks > 0 {
                debug!(
                    "[WATCHDOG] {} size {} after {} flat readings, reset",
                    symbol, size, self.watch.consecutive_flat_checks
                );
            }
            self.watch.observe_open();
            return Ok(TickOutcome::Continue);
        }

        let flat = self.watch.observe_flat();
        debug!(
            "[WATCHDOG] {} flat reading {}/{}",
            symbol, flat, self.config.confirmations
        );
        if flat >= self.config.confirmations {
            return self.cancel_residual_orders().await;
        }
        Ok(TickOutcome::Continue)
    }

    fn on_exhausted(&mut self) {
        warn!(
            "[WATCHDOG] {} unresolved after {} checks (state {:?}), giving up",
            self.watch.symbol, self.config.max_checks, self.watch.state
        );
    }
}

/// Starts watchdogs, at most one per symbol
pub struct WatchdogLauncher {
    gateway: Arc<dyn ExchangeGateway>,
    config: WatchdogConfig,
    shutdown: ShutdownSignal,
    active: Arc<DashSet<Symbol>>,
}

impl WatchdogLauncher {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        config: WatchdogConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            gateway,
            config,
            shutdown,
            active: Arc::new(DashSet::new()),
        }
    }

    /// Spawn a watchdog for `symbol`
    ///
    /// Returns `None` when one is already running for the symbol; that
    /// watchdog covers the new fill too.
    pub fn launch(
        &self,
        symbol: &str,
        constraints: &InstrumentConstraints,
    ) -> Option<JoinHandle<RunSummary>> {
        if !self.active.insert(symbol.to_string()) {
            info!("[WATCHDOG] {} already watched", symbol);
            return None;
        }

        let task = PositionWatchdog::new(self.gateway.clone(), symbol, constraints, self.config);
        let schedule = self.config.schedule();
        let shutdown = self.shutdown.clone();
        let active = self.active.clone();
        let symbol = symbol.to_string();

        info!("[WATCHDOG] {} started (epsilon {})", symbol, constraints.flat_epsilon());
        Some(tokio::spawn(async move {
            let summary = run_scheduled(task, schedule, shutdown, None).await;
            active.remove(&symbol);
            debug!("[WATCHDOG] {} stopped: {:?}", symbol, summary);
            summary
        }))
    }

    pub fn is_watching(&self, symbol: &str) -> bool {
        self.active.contains(symbol)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
