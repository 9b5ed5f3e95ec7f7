use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::Quantity;

/// Quantity constraints for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConstraints {
    /// Minimum quantity increment
    pub lot_step: Quantity,
    /// Minimum order size
    pub min_quantity: Quantity,
    /// Base-asset units represented by one contract (1 for linear/spot sizing)
    pub contract_value: Decimal,
}

impl InstrumentConstraints {
    pub fn new(lot_step: Quantity, min_quantity: Quantity) -> Self {
        Self {
            lot_step,
            min_quantity,
            contract_value: Decimal::ONE,
        }
    }

    /// Builder: Set contract value
    pub fn with_contract_value(mut self, contract_value: Decimal) -> Self {
        self.contract_value = contract_value;
        self
    }

    /// Decimal places implied by the lot step (0.01 → 2)
    pub fn quantity_precision(&self) -> u32 {
        self.lot_step.normalize().scale()
    }

    /// Position size at or below which the position counts as flat
    ///
    /// Half the minimum order size: anything smaller cannot be a real
    /// position on this instrument.
    pub fn flat_epsilon(&self) -> Quantity {
        self.min_quantity / Decimal::TWO
    }

    /// Round a quantity down to the nearest valid lot
    ///
    /// A quantity too large to count in lots rounds to zero.
    pub fn round_quantity_down(&self, quantity: Quantity) -> Quantity {
        if self.lot_step <= Decimal::ZERO {
            return quantity;
        }
        quantity
            .checked_div(self.lot_step)
            .and_then(|lots| lots.floor().checked_mul(self.lot_step))
            .map_or(Decimal::ZERO, |q| q.round_dp(self.quantity_precision()))
    }

    /// Round a quantity up to the nearest valid lot
    pub fn round_quantity_up(&self, quantity: Quantity) -> Quantity {
        if self.lot_step <= Decimal::ZERO {
            return quantity;
        }
        quantity
            .checked_div(self.lot_step)
            .and_then(|lots| lots.ceil().checked_mul(self.lot_step))
            .map_or(Decimal::ZERO, |q| q.round_dp(self.quantity_precision()))
    }
}
