//! Multi-timeframe confluence
//!
//! A symbol that signals the same direction on two paired timeframes (for
//! example 3m and 5m) within a short tolerance is a confluence. The partner
//! side is searched in both directions of time (`±window`), and the closest
//! partner signal wins. Legs are compared on [`Signal::observed_at`], so
//! alerts carrying their chart bar time match on bar time.

use chrono::Duration;
use log::info;
use swarm_core::{ConfluenceEvent, ConfluenceLeg, Signal, Timeframe};

/// Timeframe pairs and the matching tolerance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfluenceConfig {
    /// Unordered timeframe pairs
    pub pairs: Vec<(Timeframe, Timeframe)>,
    /// Maximum distance between the two legs
    pub window: Duration,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            window: Duration::seconds(600),
        }
    }
}

impl ConfluenceConfig {
    /// Builder: Add a timeframe pair
    pub fn with_pair(mut self, a: Timeframe, b: Timeframe) -> Self {
        self.pairs.push((a, b));
        self
    }

    /// Builder: Set tolerance
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.pairs.is_empty()
    }
}

pub struct ConfluenceDetector {
    config: ConfluenceConfig,
}

impl ConfluenceDetector {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    /// Partner timeframes of `timeframe`
    pub fn partners_of(&self, timeframe: Timeframe) -> Vec<Timeframe> {
        self.config
            .pairs
            .iter()
            .filter_map(|&(a, b)| {
                if a == timeframe {
                    Some(b)
                } else if b == timeframe {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Look for a partner of `signal` in a snapshot of the partner timeframe
    pub fn check(&self, signal: &Signal, partner_snapshot: &[Signal]) -> Option<ConfluenceEvent> {
        let partner = partner_snapshot
            .iter()
            .filter(|p| {
                p.timeframe != signal.timeframe
                    && p.symbol == signal.symbol
                    && p.direction == signal.direction
            })
            .map(|p| ((p.observed_at() - signal.observed_at()).abs(), p))
            .filter(|(distance, _)| *distance <= self.config.window)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, p)| p)?;

        info!(
            "[CONFLUENCE] {} {} on {} and {}",
            signal.symbol, signal.direction, signal.timeframe, partner.timeframe
        );

        Some(ConfluenceEvent {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            primary: ConfluenceLeg {
                timeframe: signal.timeframe,
                at: signal.observed_at(),
            },
            secondary: ConfluenceLeg {
                timeframe: partner.timeframe,
                at: partner.observed_at(),
            },
        })
    }
}
