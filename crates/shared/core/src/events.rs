//! Events emitted by the core to its caller
//!
//! `NotifyEvent` announces a cluster, `TradeIntent` asks for a position to be
//! opened, `ConfluenceEvent` announces a multi-timeframe agreement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::entities::{Direction, Side, Signal, Timeframe};
use crate::values::{Price, Symbol, Timestamp};

/// A cluster was detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyEvent {
    pub timeframe: Timeframe,
    pub direction: Direction,
    /// Composition at the moment of the announcement
    pub symbols: BTreeSet<Symbol>,
    pub fired_at: Timestamp,
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.direction {
            Direction::Up => "🟢",
            Direction::Down => "🔴",
        };
        let symbols: Vec<&str> = self.symbols.iter().map(String::as_str).collect();
        write!(
            f,
            "{} CLUSTER {} ({} symbols, TF {})\n{}",
            marker,
            self.direction,
            self.symbols.len(),
            self.timeframe,
            symbols.join(", ")
        )
    }
}

/// Why a trade was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOrigin {
    /// A single alert carrying an entry price
    Signal,
    /// A confirmed cluster with this composition
    Cluster { symbols: BTreeSet<Symbol> },
}

/// Request to open a risk-sized position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: Symbol,
    /// Direction of the originating signal or cluster
    pub direction: Direction,
    /// Entry side after applying the direction policy
    pub side: Side,
    pub timeframe: Timeframe,
    pub origin: TradeOrigin,
    /// Entry hint; the live price is used when absent
    pub entry: Option<Price>,
    pub stop: Option<Price>,
    pub target: Option<Price>,
    pub created_at: Timestamp,
}

impl TradeIntent {
    /// Intent for a single signal, using its price hints
    pub fn from_signal(signal: &Signal, side: Side, origin: TradeOrigin, now: Timestamp) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            side,
            timeframe: signal.timeframe,
            origin,
            entry: signal.entry,
            stop: signal.stop,
            target: signal.target,
            created_at: now,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.origin, TradeOrigin::Cluster { .. })
    }
}

/// One side of a confluence match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceLeg {
    pub timeframe: Timeframe,
    /// Bar time of the leg, or its arrival time when the alert had none
    pub at: Timestamp,
}

/// The same symbol signalled the same direction on two paired timeframes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceEvent {
    pub symbol: Symbol,
    pub direction: Direction,
    /// The signal that completed the match
    pub primary: ConfluenceLeg,
    /// The closest earlier signal on the partner timeframe
    pub secondary: ConfluenceLeg,
}

impl fmt::Display for ConfluenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "⚡ CONFLUENCE {} {}\n{}: {}\n{}: {}",
            self.direction,
            self.symbol,
            self.primary.timeframe,
            self.primary.at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.secondary.timeframe,
            self.secondary.at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}
