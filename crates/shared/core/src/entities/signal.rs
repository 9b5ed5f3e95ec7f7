use serde::{Deserialize, Serialize};

use crate::entities::{Direction, Timeframe};
use crate::values::{Price, Symbol, Timestamp};

/// Which pipeline an alert feeds, taken from the alert's `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Untyped alert; feeds every enabled path
    #[default]
    Generic,
    /// `MTF`: cluster windows only
    Cluster,
    /// `SCALP`: traded on its own, any timeframe
    Scalp,
    /// `3WAVESUP`: timeframe confluence only
    Waves,
}

/// A normalized directional alert
///
/// Produced by the transport after payload normalization and never mutated
/// afterwards. Entry/stop/target are optional hints carried by some alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// When the alert was received (window ordering key)
    pub received_at: Timestamp,
    /// Normalized symbol
    pub symbol: Symbol,
    pub direction: Direction,
    pub timeframe: Timeframe,
    /// Suggested entry price
    pub entry: Option<Price>,
    /// Suggested stop price
    pub stop: Option<Price>,
    /// Suggested take-profit price
    pub target: Option<Price>,
    /// Free-text message to forward verbatim to the notification channel
    pub message: Option<String>,
    #[serde(default)]
    pub kind: SignalKind,
    /// Close time of the chart bar that produced the alert, when sent
    #[serde(default)]
    pub bar_time: Option<Timestamp>,
}

impl Signal {
    pub fn new(
        received_at: Timestamp,
        symbol: impl Into<Symbol>,
        direction: Direction,
        timeframe: Timeframe,
    ) -> Self {
        Self {
            received_at,
            symbol: symbol.into(),
            direction,
            timeframe,
            entry: None,
            stop: None,
            target: None,
            message: None,
            kind: SignalKind::Generic,
            bar_time: None,
        }
    }

    /// Bar time when the alert carried one, arrival time otherwise
    pub fn observed_at(&self) -> Timestamp {
        self.bar_time.unwrap_or(self.received_at)
    }

    /// Builder: Set entry price
    pub fn with_entry(mut self, entry: Price) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Builder: Set stop price
    pub fn with_stop(mut self, stop: Price) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Builder: Set target price
    pub fn with_target(mut self, target: Price) -> Self {
        self.target = Some(target);
        self
    }

    /// Builder: Set the route
    pub fn with_kind(mut self, kind: SignalKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder: Set the bar time
    pub fn with_bar_time(mut self, bar_time: Timestamp) -> Self {
        self.bar_time = Some(bar_time);
        self
    }

    /// Builder: Attach a message to forward
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signal_builder() {
        let now = Utc::now();
        let signal = Signal::new(now, "BTCUSDT", Direction::Up, Timeframe::M15)
            .with_entry(dec!(100))
            .with_stop(dec!(99))
            .with_target(dec!(102.4));

        assert_eq!(signal.symbol, "BTCUSDT");
        assert_eq!(signal.entry, Some(dec!(100)));
        assert_eq!(signal.stop, Some(dec!(99)));
        assert_eq!(signal.target, Some(dec!(102.4)));
        assert!(signal.message.is_none());
        assert_eq!(signal.kind, SignalKind::Generic);
    }

    #[test]
    fn test_observed_at_prefers_bar_time() {
        let now = Utc::now();
        let signal = Signal::new(now, "ETHUSDT", Direction::Up, Timeframe::M3);
        assert_eq!(signal.observed_at(), now);

        let bar = now - chrono::Duration::seconds(40);
        assert_eq!(signal.with_bar_time(bar).observed_at(), bar);
    }

    #[test]
    fn test_signal_serializes_wire_names() {
        let signal = Signal::new(Utc::now(), "ETHUSDT", Direction::Down, Timeframe::M5);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["direction"], "DOWN");
        assert_eq!(json["timeframe"], "5m");
    }
}
