//! Volatility Estimator
//!
//! True range for candle `i > 0`:
//!
//! ```text
//! TR[i] = max(high[i] - low[i], |high[i] - close[i-1]|, |low[i] - close[i-1]|)
//! ```
//!
//! The ATR is the simple mean of the last `min(period, len(TR))` true ranges.
//! Zero means "unknown": fewer than two candles, or a flat market. The stop
//! multiplier is `ATR(short) / ATR(long)` clamped into
//! `[min_multiplier, max_multiplier]`, or exactly one when either ATR is
//! unknown.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use swarm_core::{Candle, Price};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolatilityEstimator {
    /// Recent volatility period
    pub short_period: usize,
    /// Baseline volatility period
    pub long_period: usize,
    /// Lower clamp for the multiplier
    pub min_multiplier: Decimal,
    /// Upper clamp for the multiplier
    pub max_multiplier: Decimal,
}

impl Default for VolatilityEstimator {
    fn default() -> Self {
        Self {
            short_period: 14,
            long_period: 50,
            min_multiplier: dec!(0.7),
            max_multiplier: dec!(1.3),
        }
    }
}

impl VolatilityEstimator {
    /// Builder: Set periods
    pub fn with_periods(mut self, short_period: usize, long_period: usize) -> Self {
        self.short_period = short_period.max(1);
        self.long_period = long_period.max(1);
        self
    }

    /// Builder: Set multiplier clamp
    pub fn with_bounds(mut self, min_multiplier: Decimal, max_multiplier: Decimal) -> Self {
        self.min_multiplier = min_multiplier;
        self.max_multiplier = max_multiplier;
        self
    }

    /// Candles needed to fill the long period
    pub fn candles_needed(&self) -> usize {
        self.short_period.max(self.long_period) + 1
    }

    /// Average true range over the last `period` candles
    ///
    /// Candles may arrive in any order; they are sorted oldest first.
    pub fn average_true_range(&self, candles: &[Candle], period: usize) -> Price {
        if candles.len() < 2 || period == 0 {
            return Decimal::ZERO;
        }

        let mut sorted: Vec<&Candle> = candles.iter().collect();
        sorted.sort_by_key(|c| c.open_time);

        let true_ranges: Vec<Price> = sorted
            .windows(2)
            .map(|pair| {
                let (prev, bar) = (pair[0], pair[1]);
                bar.range()
                    .max(bar.high.saturating_sub(prev.close).abs())
                    .max(bar.low.saturating_sub(prev.close).abs())
            })
            .collect();

        let take = period.min(true_ranges.len());
        true_ranges[true_ranges.len() - take..]
            .iter()
            .try_fold(Decimal::ZERO, |acc, tr| acc.checked_add(*tr))
            .and_then(|sum| sum.checked_div(Decimal::from(take)))
            .unwrap_or(Decimal::ZERO)
    }

    /// Clamped `ATR(short) / ATR(long)`; one when volatility is unknown
    pub fn multiplier(&self, candles: &[Candle]) -> Decimal {
        let short = self.average_true_range(candles, self.short_period);
        let long = self.average_true_range(candles, self.long_period);
        if short.is_zero() || long.is_zero() {
            return Decimal::ONE;
        }
        (short / long).clamp(self.min_multiplier, self.max_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candle(i: i64, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * i);
        Candle::new(t, close, high, low, close)
    }

    #[test]
    fn test_empty_or_single_candle_is_unknown() {
        let est = VolatilityEstimator::default();
        assert_eq!(est.average_true_range(&[], 14), Decimal::ZERO);
        assert_eq!(
            est.average_true_range(&[candle(0, dec!(11), dec!(9), dec!(10))], 14),
            Decimal::ZERO
        );
        assert_eq!(est.multiplier(&[]), Decimal::ONE);
    }

    #[test]
    fn test_true_range_uses_previous_close_gap() {
        let est = VolatilityEstimator::default();
        let candles = vec![
            candle(0, dec!(11), dec!(9), dec!(10)),
            // Gap up: |15 - 10| = 5 beats the 1-point range
            candle(1, dec!(15), dec!(14), dec!(14.5)),
        ];
        assert_eq!(est.average_true_range(&candles, 14), dec!(5));
    }

    #[test]
    fn test_newest_first_input_is_resorted() {
        let est = VolatilityEstimator::default();
        let mut candles = vec![
            candle(0, dec!(11), dec!(9), dec!(10)),
            candle(1, dec!(12), dec!(10), dec!(11)),
            candle(2, dec!(14), dec!(10), dec!(12)),
        ];
        let forward = est.average_true_range(&candles, 2);
        candles.reverse();
        assert_eq!(est.average_true_range(&candles, 2), forward);
        // TR = [2, 4]
        assert_eq!(forward, dec!(3));
    }

    #[test]
    fn test_period_limits_to_most_recent() {
        let est = VolatilityEstimator::default();
        let candles = vec![
            candle(0, dec!(11), dec!(9), dec!(10)),
            candle(1, dec!(12), dec!(10), dec!(11)),
            candle(2, dec!(17), dec!(11), dec!(12)),
        ];
        assert_eq!(est.average_true_range(&candles, 1), dec!(6));
    }

    #[test]
    fn test_multiplier_is_clamped() {
        let est = VolatilityEstimator::default().with_periods(1, 10);
        let mut candles: Vec<Candle> = (0..10)
            .map(|i| candle(i, dec!(101), dec!(99), dec!(100)))
            .collect();
        // Volatility spike on the last candle
        candles.push(candle(10, dec!(120), dec!(80), dec!(100)));
        assert_eq!(est.multiplier(&candles), dec!(1.3));

        let mut calm: Vec<Candle> = (0..10)
            .map(|i| candle(i, dec!(110), dec!(90), dec!(100)))
            .collect();
        calm.push(candle(10, dec!(100.1), dec!(99.9), dec!(100)));
        assert_eq!(est.multiplier(&calm), dec!(0.7));
    }

    #[test]
    fn test_flat_market_multiplier_is_one() {
        let est = VolatilityEstimator::default();
        let candles: Vec<Candle> = (0..5)
            .map(|i| candle(i, dec!(100), dec!(100), dec!(100)))
            .collect();
        assert_eq!(est.multiplier(&candles), Decimal::ONE);
    }

    #[test]
    fn test_overflowing_ranges_read_as_unknown() {
        let est = VolatilityEstimator::default();
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let candles: Vec<Candle> = (0..3)
            .map(|i| candle(i, huge, dec!(1), dec!(1)))
            .collect();
        assert_eq!(est.average_true_range(&candles, 14), Decimal::ZERO);
        assert_eq!(est.multiplier(&candles), Decimal::ONE);
    }
}
