//! Order request types sent through the exchange gateway

use serde::{Deserialize, Serialize};

use crate::entities::Side;
use crate::values::{Price, Quantity, Symbol};

/// Market order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Client-assigned order ID for correlation
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
}

/// Limit order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    /// Only allowed to shrink an existing position
    pub reduce_only: bool,
}

/// Which way price must cross the trigger for a conditional order to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerDirection {
    /// Fires when price rises to or above the trigger
    Rising,
    /// Fires when price falls to or below the trigger
    Falling,
}

impl TriggerDirection {
    /// Trigger direction that fires only when price moves against a position
    /// whose protective orders are on `exit_side`
    pub fn adverse_for(exit_side: Side) -> Self {
        match exit_side {
            // Selling out of a long: protect against a fall
            Side::Sell => TriggerDirection::Falling,
            // Buying back a short: protect against a rise
            Side::Buy => TriggerDirection::Rising,
        }
    }

    /// Whether `price` satisfies this trigger at `trigger_price`
    pub fn is_triggered(&self, price: Price, trigger_price: Price) -> bool {
        match self {
            TriggerDirection::Rising => price >= trigger_price,
            TriggerDirection::Falling => price <= trigger_price,
        }
    }
}

/// Trigger-based (stop) market order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOrder {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub trigger_price: Price,
    pub trigger_direction: TriggerDirection,
    pub reduce_only: bool,
}

/// Exchange acknowledgement of an accepted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub client_order_id: String,
    pub exchange_order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adverse_trigger_direction() {
        assert_eq!(
            TriggerDirection::adverse_for(Side::Sell),
            TriggerDirection::Falling
        );
        assert_eq!(
            TriggerDirection::adverse_for(Side::Buy),
            TriggerDirection::Rising
        );
    }

    #[test]
    fn test_is_triggered() {
        assert!(TriggerDirection::Falling.is_triggered(dec!(99), dec!(99)));
        assert!(!TriggerDirection::Falling.is_triggered(dec!(99.5), dec!(99)));
        assert!(TriggerDirection::Rising.is_triggered(dec!(101), dec!(100)));
    }
}
