use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::Side;
use crate::values::{Price, Quantity, Symbol};

/// A fully sized order with its protective prices
///
/// `quantity` is already normalized to the instrument's lot step and minimum
/// size. An order with a non-positive quantity is never submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub entry_price: Price,
    pub stop_price: Price,
    pub target_price: Price,
}

impl RiskOrder {
    /// Whether the order can be submitted at all
    pub fn is_submittable(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Loss at the stop price per unit of quantity
    pub fn stop_distance(&self) -> Price {
        (self.entry_price - self.stop_price).abs()
    }

    /// Side of the reduce-only protective orders
    pub fn exit_side(&self) -> Side {
        self.side.opposite()
    }
}
