//! Trade Planner
//!
//! Places stop and target around the live entry price and sizes the order.
//!
//! - An explicit stop/target carried by the intent is kept when it sits on
//!   the protective side of the entry.
//! - Otherwise the stop distance is `entry * base_stop_pct * multiplier`,
//!   where the multiplier comes from [`VolatilityEstimator`] (exactly one when
//!   no candles are available), and the target sits `reward_ratio` stop
//!   distances away on the other side.

use log::{debug, info};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use swarm_core::{Candle, InstrumentConstraints, Price, RiskOrder, TradeIntent};

use crate::error::{Result, SizingError};
use crate::sizer::RiskSizer;
use crate::volatility::VolatilityEstimator;

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Stop distance as a fraction of entry (0.003 = 0.3%)
    pub base_stop_pct: Decimal,
    /// Target distance in stop distances
    pub reward_ratio: Decimal,
    /// Maximum loss at the stop, in quote currency
    pub risk_budget: Decimal,
    /// Decimal places for stop and target prices
    pub price_precision: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_stop_pct: dec!(0.003),
            reward_ratio: dec!(2.4),
            risk_budget: dec!(1),
            price_precision: 6,
        }
    }
}

impl PlannerConfig {
    /// Builder: Set risk budget
    pub fn with_risk_budget(mut self, risk_budget: Decimal) -> Self {
        self.risk_budget = risk_budget;
        self
    }

    /// Builder: Set base stop percentage and reward ratio
    pub fn with_stop(mut self, base_stop_pct: Decimal, reward_ratio: Decimal) -> Self {
        self.base_stop_pct = base_stop_pct;
        self.reward_ratio = reward_ratio;
        self
    }
}

pub struct TradePlanner {
    sizer: RiskSizer,
    estimator: VolatilityEstimator,
    config: PlannerConfig,
}

impl TradePlanner {
    pub fn new(config: PlannerConfig, estimator: VolatilityEstimator) -> Self {
        Self {
            sizer: RiskSizer::new(),
            estimator,
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &VolatilityEstimator {
        &self.estimator
    }

    /// Build a sized order for `intent` entering at `entry`
    pub fn plan(
        &self,
        intent: &TradeIntent,
        entry: Price,
        candles: &[Candle],
        constraints: &InstrumentConstraints,
    ) -> Result<RiskOrder> {
        if entry <= Decimal::ZERO {
            return Err(SizingError::InvalidPrice {
                field: "entry",
                value: entry,
            });
        }
        if self.config.risk_budget <= Decimal::ZERO {
            return Err(SizingError::InvalidBudget(self.config.risk_budget));
        }
        if constraints.lot_step <= Decimal::ZERO || constraints.contract_value <= Decimal::ZERO {
            return Err(SizingError::InvalidConstraints(format!(
                "lot_step={} contract_value={}",
                constraints.lot_step, constraints.contract_value
            )));
        }

        let long = intent.side.is_long();
        let protective = |price: Price| if long { price < entry } else { price > entry };
        let rewarding = |price: Price| if long { price > entry } else { price < entry };

        let overflow = |field: &'static str| SizingError::InvalidPrice { field, value: entry };

        let stop_distance = match intent.stop {
            Some(stop) if stop > Decimal::ZERO && protective(stop) => (entry - stop).abs(),
            _ => {
                let multiplier = self.estimator.multiplier(candles);
                debug!(
                    "[PLAN] {} volatility multiplier {} over {} candles",
                    intent.symbol,
                    multiplier,
                    candles.len()
                );
                entry
                    .checked_mul(self.config.base_stop_pct)
                    .and_then(|d| d.checked_mul(multiplier))
                    .ok_or_else(|| overflow("stop"))?
            }
        };

        let stop = if long {
            entry.checked_sub(stop_distance)
        } else {
            entry.checked_add(stop_distance)
        }
        .ok_or_else(|| overflow("stop"))?
        .round_dp(self.config.price_precision);

        let target = match intent.target {
            Some(target) if target > Decimal::ZERO && rewarding(target) => target,
            _ => stop_distance
                .checked_mul(self.config.reward_ratio)
                .and_then(|reward| {
                    if long {
                        entry.checked_add(reward)
                    } else {
                        entry.checked_sub(reward)
                    }
                })
                .ok_or_else(|| overflow("target"))?,
        }
        .round_dp(self.config.price_precision);

        if stop <= Decimal::ZERO || !protective(stop) {
            return Err(SizingError::InvalidPrice {
                field: "stop",
                value: stop,
            });
        }
        if target <= Decimal::ZERO {
            return Err(SizingError::InvalidPrice {
                field: "target",
                value: target,
            });
        }

        let quantity = self
            .sizer
            .quantity(entry, stop, self.config.risk_budget, constraints);
        if quantity <= Decimal::ZERO {
            return Err(SizingError::ZeroQuantity {
                symbol: intent.symbol.clone(),
            });
        }

        info!(
            "[PLAN] {} {} qty={} entry={} stop={} target={}",
            intent.symbol, intent.side, quantity, entry, stop, target
        );

        Ok(RiskOrder {
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity,
            entry_price: entry,
            stop_price: stop,
            target_price: target,
        })
    }
}
