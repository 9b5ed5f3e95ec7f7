//! Trade failure taxonomy

use serde::Serialize;
use std::fmt;
use swarm_ports::GatewayError;
use swarm_risk::SizingError;
use thiserror::Error;

/// Where a trade attempt stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStage {
    /// Fetching lot step / minimum size
    Instrument,
    /// Fetching the live entry price
    Pricing,
    /// Stop/target placement or quantity
    Sizing,
    /// Market entry
    Entry,
    /// Reduce-only take-profit
    TakeProfit,
    /// Trigger-based stop-loss
    StopLoss,
}

impl TradeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStage::Instrument => "instrument",
            TradeStage::Pricing => "pricing",
            TradeStage::Sizing => "sizing",
            TradeStage::Entry => "entry",
            TradeStage::TakeProfit => "take_profit",
            TradeStage::StopLoss => "stop_loss",
        }
    }

    /// Whether a position may already exist when this stage fails
    pub fn is_after_entry(&self) -> bool {
        matches!(self, TradeStage::TakeProfit | TradeStage::StopLoss)
    }
}

impl fmt::Display for TradeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("{stage} failed: {source}")]
    Gateway {
        stage: TradeStage,
        #[source]
        source: GatewayError,
    },

    #[error("sizing failed: {0}")]
    Sizing(#[from] SizingError),
}

impl TradeError {
    pub fn gateway(stage: TradeStage, source: GatewayError) -> Self {
        TradeError::Gateway { stage, source }
    }

    pub fn stage(&self) -> TradeStage {
        match self {
            TradeError::Gateway { stage, .. } => *stage,
            TradeError::Sizing(_) => TradeStage::Sizing,
        }
    }
}

pub type Result<T> = std::result::Result<T, TradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_reported_in_message() {
        let err = TradeError::gateway(
            TradeStage::TakeProfit,
            GatewayError::rejected("51008", "insufficient margin"),
        );
        assert_eq!(err.stage(), TradeStage::TakeProfit);
        assert_eq!(
            err.to_string(),
            "take_profit failed: rejected [51008]: insufficient margin"
        );
        assert!(err.stage().is_after_entry());
    }
}
