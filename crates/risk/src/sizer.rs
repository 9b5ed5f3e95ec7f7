//! Risk-based quantity
//!
//! ```text
//! raw      = risk_budget / (|entry - stop| * contract_value)
//! quantity = max(min_quantity, floor(raw / lot_step) * lot_step)
//! ```
//!
//! Fails closed: any invalid input yields a quantity of zero, never a
//! negative or unbounded one.

use log::debug;
use rust_decimal::Decimal;
use swarm_core::{InstrumentConstraints, Price, Quantity};

/// Stop distances below this are treated as zero
const MIN_STOP_DISTANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 12);

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskSizer;

impl RiskSizer {
    pub fn new() -> Self {
        Self
    }

    /// Quantity risking at most `risk_budget` between `entry` and `stop`
    ///
    /// The minimum order size wins over the budget: when one minimum lot
    /// already risks more than the budget, the minimum lot is returned.
    pub fn quantity(
        &self,
        entry: Price,
        stop: Price,
        risk_budget: Decimal,
        constraints: &InstrumentConstraints,
    ) -> Quantity {
        if entry <= Decimal::ZERO || stop <= Decimal::ZERO || risk_budget <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if constraints.lot_step <= Decimal::ZERO
            || constraints.min_quantity < Decimal::ZERO
            || constraints.contract_value <= Decimal::ZERO
        {
            debug!("[SIZER] unusable constraints {:?}", constraints);
            return Decimal::ZERO;
        }

        let distance = (entry - stop).abs();
        if distance < MIN_STOP_DISTANCE {
            return Decimal::ZERO;
        }

        let Some(raw) = distance
            .checked_mul(constraints.contract_value)
            .and_then(|per_unit| risk_budget.checked_div(per_unit))
        else {
            return Decimal::ZERO;
        };

        let stepped = constraints.round_quantity_down(raw);
        let minimum = constraints.round_quantity_up(constraints.min_quantity);
        let quantity = stepped.max(minimum).round_dp(constraints.quantity_precision());

        debug!(
            "[SIZER] entry={} stop={} risk={} raw={} -> {}",
            entry, stop, risk_budget, raw, quantity
        );
        quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn constraints(step: Decimal, min: Decimal) -> InstrumentConstraints {
        InstrumentConstraints::new(step, min)
    }

    #[test]
    fn test_one_unit_per_point_of_risk() {
        let qty = RiskSizer.quantity(dec!(100), dec!(99), dec!(1), &constraints(dec!(0.01), dec!(0.01)));
        assert_eq!(qty, dec!(1.00));
    }

    #[test]
    fn test_rounds_down_to_lot_step() {
        // raw = 1 / 0.3 = 3.333...
        let qty = RiskSizer.quantity(dec!(10), dec!(9.7), dec!(1), &constraints(dec!(0.1), dec!(0.1)));
        assert_eq!(qty, dec!(3.3));
    }

    #[test]
    fn test_minimum_size_applies() {
        // raw = 1 / 50 = 0.02
        let qty = RiskSizer.quantity(dec!(100), dec!(50), dec!(1), &constraints(dec!(0.01), dec!(0.1)));
        assert_eq!(qty, dec!(0.1));
    }

    #[test]
    fn test_contract_value_scales_quantity() {
        let c = constraints(dec!(1), dec!(1)).with_contract_value(dec!(0.1));
        // 1 / (1 * 0.1) = 10 contracts
        assert_eq!(RiskSizer.quantity(dec!(100), dec!(99), dec!(1), &c), dec!(10));
    }

    #[test]
    fn test_fails_closed_on_bad_inputs() {
        let c = constraints(dec!(0.01), dec!(0.01));
        assert_eq!(RiskSizer.quantity(dec!(0), dec!(99), dec!(1), &c), Decimal::ZERO);
        assert_eq!(RiskSizer.quantity(dec!(100), dec!(-1), dec!(1), &c), Decimal::ZERO);
        assert_eq!(RiskSizer.quantity(dec!(100), dec!(99), dec!(0), &c), Decimal::ZERO);
        assert_eq!(RiskSizer.quantity(dec!(100), dec!(100), dec!(1), &c), Decimal::ZERO);
        assert_eq!(
            RiskSizer.quantity(dec!(100), dec!(99), dec!(1), &constraints(dec!(0), dec!(0.01))),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_short_stop_above_entry() {
        let qty = RiskSizer.quantity(dec!(99), dec!(100), dec!(2), &constraints(dec!(0.01), dec!(0.01)));
        assert_eq!(qty, dec!(2.00));
    }

    proptest! {
        #[test]
        fn prop_quantity_is_zero_or_valid_lot_multiple(
            entry_cents in 1i64..10_000_000,
            stop_cents in 1i64..10_000_000,
            risk_cents in 1i64..100_000,
            step_exp in 0u32..5,
            min_lots in 1i64..20,
        ) {
            let step = Decimal::new(1, step_exp);
            let min = step * Decimal::from(min_lots);
            let c = constraints(step, min);

            let qty = RiskSizer.quantity(
                Decimal::new(entry_cents, 2),
                Decimal::new(stop_cents, 2),
                Decimal::new(risk_cents, 2),
                &c,
            );

            prop_assert!(qty >= Decimal::ZERO);
            if qty > Decimal::ZERO {
                prop_assert!(qty >= min);
                prop_assert_eq!(qty % step, Decimal::ZERO);
            }
        }

        #[test]
        fn prop_budget_respected_above_minimum(
            entry_cents in 100i64..1_000_000,
            offset_cents in 1i64..10_000,
            risk_cents in 100i64..100_000,
        ) {
            let entry = Decimal::new(entry_cents, 2);
            let stop = entry - Decimal::new(offset_cents, 2);
            prop_assume!(stop > Decimal::ZERO);
            let risk = Decimal::new(risk_cents, 2);
            let c = constraints(dec!(0.001), dec!(0.001));

            let qty = RiskSizer.quantity(entry, stop, risk, &c);
            if qty > c.min_quantity {
                prop_assert!(qty * (entry - stop) <= risk);
            }
        }
    }
}
