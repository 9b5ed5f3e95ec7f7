//! Swarm - wiring and lifecycle
//!
//! Builds the dispatcher and spawns the long-lived loops:
//! - one [`ClusterLoop`] per cluster timeframe
//! - one [`TradeWorker`] when trading is enabled
//! - one [`swarm_notify::OutboxWorker`] for rate-limited notifications
//!
//! Position watchdogs are spawned on demand by the executor.

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use swarm_clock::{RunSummary, Schedule, Shutdown, run_scheduled};
use swarm_core::Signal;
use swarm_execution::WatchdogLauncher;
use swarm_ports::{Clock, EventListener, ExchangeGateway, Notifier, Recorder};
use swarm_signals::IngestResult;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cluster_loop::ClusterLoop;
use crate::config::SwarmConfig;
use crate::dispatcher::{Dispatcher, DispatcherParts};
use crate::trade_worker::TradeWorker;

/// How long shutdown waits for queued notifications
const OUTBOX_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborators
pub struct SwarmDeps {
    pub clock: Arc<dyn Clock>,
    pub gateway: Arc<dyn ExchangeGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub listener: Arc<dyn EventListener>,
    pub recorder: Arc<dyn Recorder>,
}

/// Totals reported after shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwarmSummary {
    pub cluster_ticks: u64,
    pub trade_attempts: u64,
    pub notifications_delivered: u64,
}

pub struct Swarm {
    dispatcher: Arc<Dispatcher>,
    launcher: Option<Arc<WatchdogLauncher>>,
    shutdown: Shutdown,
    outbox_shutdown: Shutdown,
    cluster_loops: Vec<JoinHandle<RunSummary>>,
    trade_worker: Option<JoinHandle<u64>>,
    outbox_worker: JoinHandle<u64>,
}

impl Swarm {
    /// Wire everything and spawn the background loops
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: SwarmConfig, deps: SwarmDeps) -> Self {
        let shutdown = Shutdown::new();
        let outbox_shutdown = Shutdown::new();

        let (outbox, worker) = swarm_notify::outbox(config.notify, deps.notifier);
        let outbox = Arc::new(outbox);
        let outbox_worker = tokio::spawn(worker.run(outbox_shutdown.signal()));

        let (trades_tx, trades_rx) = if config.trading.enabled {
            let (tx, rx) = mpsc::channel(config.trading.queue_capacity.max(1));
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let dispatcher = Arc::new(Dispatcher::new(
            &config,
            DispatcherParts {
                clock: deps.clock.clone(),
                listener: deps.listener,
                recorder: deps.recorder.clone(),
                outbox: outbox.clone(),
                trades: trades_tx,
            },
        ));

        let schedule = Schedule::every(config.check_interval);
        let cluster_loops = dispatcher
            .cluster_timeframes()
            .into_iter()
            .map(|timeframe| {
                let task = ClusterLoop::new(dispatcher.clone(), timeframe);
                let wake = dispatcher.wake_handle(timeframe);
                tokio::spawn(run_scheduled(task, schedule, shutdown.signal(), wake))
            })
            .collect::<Vec<_>>();

        let (launcher, trade_worker) = match trades_rx {
            Some(rx) => {
                let launcher = Arc::new(WatchdogLauncher::new(
                    deps.gateway.clone(),
                    config.trading.watchdog,
                    shutdown.signal(),
                ));
                let worker = TradeWorker::new(
                    deps.gateway,
                    &config.trading,
                    launcher.clone(),
                    outbox,
                    deps.recorder,
                    deps.clock,
                );
                (
                    Some(launcher),
                    Some(tokio::spawn(worker.run(rx, shutdown.signal()))),
                )
            }
            None => (None, None),
        };

        info!(
            "[DISPATCH] swarm started: {} cluster loops, trading {}",
            cluster_loops.len(),
            if trade_worker.is_some() { "on" } else { "off" }
        );

        Self {
            dispatcher,
            launcher,
            shutdown,
            outbox_shutdown,
            cluster_loops,
            trade_worker,
            outbox_worker,
        }
    }

    pub fn ingest(&self, signal: Signal) -> IngestResult {
        self.dispatcher.ingest(signal)
    }

    pub fn ingest_raw(&self, raw: &str) -> IngestResult {
        self.dispatcher.ingest_raw(raw)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Open-position watchdogs; `None` when trading is disabled
    pub fn launcher(&self) -> Option<&Arc<WatchdogLauncher>> {
        self.launcher.as_ref()
    }

    /// Stop every loop and drain queued notifications
    pub async fn shutdown(self) -> SwarmSummary {
        info!("[DISPATCH] shutting down");
        self.shutdown.trigger();

        let mut summary = SwarmSummary::default();
        for handle in self.cluster_loops {
            match handle.await {
                Ok(run) => summary.cluster_ticks += run.ticks,
                Err(e) => warn!("[DISPATCH] cluster loop ended abnormally: {}", e),
            }
        }
        if let Some(handle) = self.trade_worker {
            match handle.await {
                Ok(attempts) => summary.trade_attempts = attempts,
                Err(e) => warn!("[DISPATCH] trade worker ended abnormally: {}", e),
            }
        }

        // The worker finishes on its own once every outbox handle is gone
        drop(self.dispatcher);
        drop(self.launcher);
        let mut outbox_worker = self.outbox_worker;
        let delivered = match tokio::time::timeout(OUTBOX_DRAIN_TIMEOUT, &mut outbox_worker).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[NOTIFY] outbox not drained after {:?}, stopping", OUTBOX_DRAIN_TIMEOUT);
                self.outbox_shutdown.trigger();
                outbox_worker.await
            }
        };
        match delivered {
            Ok(delivered) => summary.notifications_delivered = delivered,
            Err(e) => warn!("[NOTIFY] outbox worker ended abnormally: {}", e),
        }

        info!("[DISPATCH] stopped: {:?}", summary);
        summary
    }
}
