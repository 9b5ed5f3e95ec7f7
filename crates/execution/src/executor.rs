//! Order Executor
//!
//! Places one sized [`RiskOrder`] on the exchange. Each step's failure
//! short-circuits the remaining steps and is reported in the
//! [`ExecutionReport`]; nothing is swallowed. Once the entry has filled a
//! watchdog is always started, even when a protective order failed, so the
//! position is never left unmonitored.
//!
//! Order placement runs under `order_policy` (a single attempt by default:
//! resubmitting an order after a timeout could double the position). The
//! price query runs under `query_policy`.

use log::{error, info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use swarm_clock::RunSummary;
use swarm_core::{
    ConditionalOrder, InstrumentConstraints, LimitOrder, MarketOrder, OrderAck, Price, RiskOrder,
    Side, TriggerDirection,
};
use swarm_gateway::RetryPolicy;
use swarm_ports::ExchangeGateway;
use swarm_risk::SizingError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Result, TradeError, TradeStage};
use crate::watchdog::WatchdogLauncher;

/// Executor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Offset from the live price for a stop found on the wrong side
    pub stop_correction_pct: Decimal,
    /// Decimal places for corrected prices
    pub price_precision: u32,
    /// Policy for order submissions
    pub order_policy: RetryPolicy,
    /// Policy for the live price query
    pub query_policy: RetryPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            stop_correction_pct: dec!(0.003),
            price_precision: 6,
            order_policy: RetryPolicy::once(Duration::from_secs(10)),
            query_policy: RetryPolicy::default(),
        }
    }
}

impl ExecutionConfig {
    /// Builder: Set stop correction offset
    pub fn with_stop_correction(mut self, pct: Decimal) -> Self {
        self.stop_correction_pct = pct;
        self
    }

    /// Builder: Set policies
    pub fn with_policies(mut self, order_policy: RetryPolicy, query_policy: RetryPolicy) -> Self {
        self.order_policy = order_policy;
        self.query_policy = query_policy;
        self
    }
}

/// What happened to an order whose entry filled
#[derive(Debug)]
pub struct ExecutionReport {
    /// The order as submitted (stop after correction)
    pub order: RiskOrder,
    pub entry: OrderAck,
    pub take_profit: Option<OrderAck>,
    pub stop_loss: Option<OrderAck>,
    /// First protective step that failed
    pub failure: Option<TradeError>,
    /// `None` when a watchdog was already running for the symbol
    pub watchdog: Option<JoinHandle<RunSummary>>,
}

impl ExecutionReport {
    /// Both protective orders are resting
    pub fn is_protected(&self) -> bool {
        self.failure.is_none() && self.take_profit.is_some() && self.stop_loss.is_some()
    }
}

/// Stop price valid against `live`, or a fixed offset from it
///
/// A long's stop must sit below the market, a short's above; anything else
/// would be rejected or trigger immediately.
pub fn correct_stop(side: Side, stop: Price, live: Price, pct: Decimal, precision: u32) -> Price {
    if live <= Decimal::ZERO {
        return stop;
    }
    match side {
        Side::Buy if stop >= live => (live * (Decimal::ONE - pct)).round_dp(precision),
        Side::Sell if stop <= live => live.saturating_mul(Decimal::ONE + pct).round_dp(precision),
        _ => stop,
    }
}

fn client_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct OrderExecutor {
    gateway: Arc<dyn ExchangeGateway>,
    launcher: Arc<WatchdogLauncher>,
    config: ExecutionConfig,
}

impl OrderExecutor {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        launcher: Arc<WatchdogLauncher>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            gateway,
            launcher,
            config,
        }
    }

    pub fn launcher(&self) -> &Arc<WatchdogLauncher> {
        &self.launcher
    }

    /// Run the entry + protection sequence
    ///
    /// `Err` means no position was opened. Failures after the entry filled
    /// are in [`ExecutionReport::failure`].
    pub async fn execute(
        &self,
        order: &RiskOrder,
        constraints: &InstrumentConstraints,
    ) -> Result<ExecutionReport> {
        if !order.is_submittable() {
            return Err(TradeError::Sizing(SizingError::ZeroQuantity {
                symbol: order.symbol.clone(),
            }));
        }

        // 1. Entry
        let entry_order = MarketOrder {
            client_order_id: client_order_id(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
        };
        let entry = self
            .config
            .order_policy
            .run("place_market_order", || {
                self.gateway.place_market_order(&entry_order)
            })
            .await
            .map_err(|e| {
                error!("[EXEC] {} entry refused: {}", order.symbol, e);
                TradeError::gateway(TradeStage::Entry, e)
            })?;
        info!(
            "[EXEC] {} {} {} entry filled ({})",
            order.symbol, order.side, order.quantity, entry.exchange_order_id
        );

        let mut report = ExecutionReport {
            order: order.clone(),
            entry,
            take_profit: None,
            stop_loss: None,
            failure: None,
            watchdog: None,
        };

        if let Err(failure) = self.protect(&mut report).await {
            warn!(
                "[EXEC] {} left unprotected at {}: {}",
                order.symbol,
                failure.stage(),
                failure
            );
            report.failure = Some(failure);
        }

        // 6. Watchdog, regardless of protection
        report.watchdog = self.launcher.launch(&order.symbol, constraints);
        Ok(report)
    }

    /// Steps 2 to 5
    async fn protect(&self, report: &mut ExecutionReport) -> Result<()> {
        let symbol = report.order.symbol.clone();
        let exit_side = report.order.exit_side();

        // 2. Live price, best effort
        let live = match self
            .config
            .query_policy
            .run("get_last_price", || self.gateway.get_last_price(&symbol))
            .await
        {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("[EXEC] {} live price unavailable, stop kept as planned: {}", symbol, e);
                None
            }
        };

        // 3. Take-profit
        let take_profit = LimitOrder {
            client_order_id: client_order_id(),
            symbol: symbol.clone(),
            side: exit_side,
            quantity: report.order.quantity,
            price: report.order.target_price,
            reduce_only: true,
        };
        let ack = self
            .config
            .order_policy
            .run("place_limit_order", || self.gateway.place_limit_order(&take_profit))
            .await
            .map_err(|e| TradeError::gateway(TradeStage::TakeProfit, e))?;
        info!("[EXEC] {} take-profit at {}", symbol, take_profit.price);
        report.take_profit = Some(ack);

        // 4. Stop correction
        let planned = report.order.stop_price;
        let stop = match live {
            Some(live) => correct_stop(
                report.order.side,
                planned,
                live,
                self.config.stop_correction_pct,
                self.config.price_precision,
            ),
            None => planned,
        };
        if stop != planned {
            warn!(
                "[EXEC] {} stop {} invalid against live {:?}, moved to {}",
                symbol, planned, live, stop
            );
            report.order.stop_price = stop;
        }

        // 5. Stop-loss
        let stop_loss = ConditionalOrder {
            client_order_id: client_order_id(),
            symbol: symbol.clone(),
            side: exit_side,
            quantity: report.order.quantity,
            trigger_price: stop,
            trigger_direction: TriggerDirection::adverse_for(exit_side),
            reduce_only: true,
        };
        let ack = self
            .config
            .order_policy
            .run("place_conditional_order", || {
                self.gateway.place_conditional_order(&stop_loss)
            })
            .await
            .map_err(|e| TradeError::gateway(TradeStage::StopLoss, e))?;
        info!("[EXEC] {} stop-loss at {}", symbol, stop);
        report.stop_loss = Some(ack);

        Ok(())
    }
}
