//! Trade Worker
//!
//! Consumes [`TradeIntent`]s one at a time, off the request path:
//!
//! ```text
//! intent ──► constraints ──► open-position guard ──► live price
//!        ──► candles ──► TradePlanner ──► OrderExecutor ──► outcome
//!                                                             │
//!                                          one notification ◄─┤
//!                                          one audit record ◄─┘
//! ```
//!
//! Every attempt ends in exactly one [`TradeOutcome`] and exactly one
//! notification, whichever step it stopped at.

use log::{error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use swarm_clock::ShutdownSignal;
use swarm_core::{InstrumentConstraints, Price, TradeIntent};
use swarm_execution::{OrderExecutor, TradeStage, WatchdogLauncher};
use swarm_gateway::RetryPolicy;
use swarm_notify::NotificationOutbox;
use swarm_ports::{AuditEvent, Clock, ExchangeGateway, GatewayError, Recorder, TradeOutcome};
use swarm_risk::TradePlanner;
use tokio::sync::mpsc;

use crate::config::TradingConfig;

pub struct TradeWorker {
    gateway: Arc<dyn ExchangeGateway>,
    planner: TradePlanner,
    executor: OrderExecutor,
    query_policy: RetryPolicy,
    outbox: Arc<NotificationOutbox>,
    recorder: Arc<dyn Recorder>,
    clock: Arc<dyn Clock>,
}

impl TradeWorker {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        trading: &TradingConfig,
        launcher: Arc<WatchdogLauncher>,
        outbox: Arc<NotificationOutbox>,
        recorder: Arc<dyn Recorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            planner: TradePlanner::new(trading.planner.clone(), trading.estimator.clone()),
            executor: OrderExecutor::new(gateway.clone(), launcher, trading.execution),
            query_policy: trading.execution.query_policy,
            gateway,
            outbox,
            recorder,
            clock,
        }
    }

    pub fn executor(&self) -> &OrderExecutor {
        &self.executor
    }

    /// Drain intents until shutdown or until the queue closes
    ///
    /// Returns the number of attempts handled.
    pub async fn run(self, mut rx: mpsc::Receiver<TradeIntent>, mut shutdown: ShutdownSignal) -> u64 {
        info!("[TRADE] worker started");
        let mut handled = 0u64;

        loop {
            let intent = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                next = rx.recv() => match next {
                    Some(intent) => intent,
                    None => break,
                },
            };
            self.handle(&intent).await;
            handled += 1;
        }

        info!("[TRADE] worker stopped after {} attempts", handled);
        handled
    }

    /// Run one attempt to completion
    pub async fn handle(&self, intent: &TradeIntent) -> TradeOutcome {
        let outcome = self.attempt(intent).await;

        match &outcome {
            TradeOutcome::Protected { .. } => info!("[TRADE] {} protected", intent.symbol),
            TradeOutcome::Unprotected { failed_stage, .. } => {
                error!("[TRADE] {} open without {}", intent.symbol, failed_stage)
            }
            TradeOutcome::Aborted { stage, error } => {
                warn!("[TRADE] {} aborted at {}: {}", intent.symbol, stage, error)
            }
            TradeOutcome::Skipped { reason } => info!("[TRADE] {} skipped: {}", intent.symbol, reason),
        }

        self.outbox.push(describe(intent, &outcome));
        self.recorder.record(AuditEvent::TradeAttempt {
            intent: intent.clone(),
            outcome: outcome.clone(),
            at: self.clock.now(),
        });
        outcome
    }

    async fn attempt(&self, intent: &TradeIntent) -> TradeOutcome {
        let symbol = intent.symbol.as_str();

        let constraints = match self
            .query_policy
            .run("get_instrument_constraints", || {
                self.gateway.get_instrument_constraints(symbol)
            })
            .await
        {
            Ok(constraints) => constraints,
            Err(e) => return aborted(TradeStage::Instrument, &e),
        };

        if let Some(size) = self.open_position(symbol, &constraints).await {
            return TradeOutcome::Skipped {
                reason: format!("open position {}", size),
            };
        }

        let Some(entry) = self.entry_price(intent).await else {
            return TradeOutcome::Aborted {
                stage: TradeStage::Pricing.as_str().to_string(),
                error: "no live price and no entry hint".to_string(),
            };
        };

        let candles = match self
            .query_policy
            .run("get_candles", || {
                self.gateway.get_candles(
                    symbol,
                    intent.timeframe,
                    self.planner.estimator().candles_needed(),
                )
            })
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!("[TRADE] {} candles unavailable, fixed stop used: {}", symbol, e);
                Vec::new()
            }
        };

        let order = match self.planner.plan(intent, entry, &candles, &constraints) {
            Ok(order) => order,
            Err(e) => {
                return TradeOutcome::Aborted {
                    stage: TradeStage::Sizing.as_str().to_string(),
                    error: e.to_string(),
                };
            }
        };

        match self.executor.execute(&order, &constraints).await {
            Err(e) => TradeOutcome::Aborted {
                stage: e.stage().as_str().to_string(),
                error: e.to_string(),
            },
            Ok(report) => match report.failure {
                Some(failure) => TradeOutcome::Unprotected {
                    order: report.order,
                    failed_stage: failure.stage().as_str().to_string(),
                    error: failure.to_string(),
                },
                None => TradeOutcome::Protected {
                    order: report.order,
                },
            },
        }
    }

    /// Size of a non-flat position; a failed query does not block the trade
    async fn open_position(
        &self,
        symbol: &str,
        constraints: &InstrumentConstraints,
    ) -> Option<Decimal> {
        match self
            .query_policy
            .run("get_position_size", || self.gateway.get_position_size(symbol))
            .await
        {
            Ok(size) if size > constraints.flat_epsilon() => Some(size),
            Ok(_) => None,
            Err(e) => {
                warn!("[TRADE] {} position check failed, proceeding: {}", symbol, e);
                None
            }
        }
    }

    /// Live price, else the intent's entry hint
    async fn entry_price(&self, intent: &TradeIntent) -> Option<Price> {
        match self
            .query_policy
            .run("get_last_price", || self.gateway.get_last_price(&intent.symbol))
            .await
        {
            Ok(price) if price > Decimal::ZERO => Some(price),
            Ok(price) => {
                warn!("[TRADE] {} non-positive live price {}", intent.symbol, price);
                intent.entry
            }
            Err(e) => {
                warn!("[TRADE] {} live price unavailable: {}", intent.symbol, e);
                intent.entry
            }
        }
    }
}

fn aborted(stage: TradeStage, error: &GatewayError) -> TradeOutcome {
    TradeOutcome::Aborted {
        stage: stage.as_str().to_string(),
        error: error.to_string(),
    }
}

/// Notification text for one attempt
pub fn describe(intent: &TradeIntent, outcome: &TradeOutcome) -> String {
    let origin = if intent.is_cluster() { "cluster" } else { "signal" };
    let head = format!(
        "{} {} {} ({} {})",
        intent.symbol,
        intent.side.as_str().to_uppercase(),
        intent.timeframe,
        origin,
        intent.direction
    );

    match outcome {
        TradeOutcome::Protected { order } => format!(
            "✅ TRADE OPENED {}\nqty {} entry {}\nSL {} TP {}",
            head, order.quantity, order.entry_price, order.stop_price, order.target_price
        ),
        TradeOutcome::Unprotected {
            order,
            failed_stage,
            error,
        } => format!(
            "⚠️ TRADE OPEN WITHOUT PROTECTION {}\nqty {} entry {}\n{} failed: {}",
            head, order.quantity, order.entry_price, failed_stage, error
        ),
        TradeOutcome::Aborted { stage, error } => {
            format!("❌ TRADE FAILED {}\n{} failed: {}", head, stage, error)
        }
        TradeOutcome::Skipped { reason } => format!("⏭ TRADE SKIPPED {}\n{}", head, reason),
    }
}
