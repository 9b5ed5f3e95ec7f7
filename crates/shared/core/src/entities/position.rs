use serde::{Deserialize, Serialize};

use crate::values::Symbol;

/// Lifecycle of a watched position
///
/// `Opening → Open → Closing → Closed`. `Closing` means flat readings are
/// being confirmed; any non-flat reading moves back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    /// Entry submitted, exchange has not reported the position yet
    Opening,
    /// Position reported non-flat
    Open,
    /// Flat readings observed, awaiting confirmation
    Closing,
    /// Flat confirmed and residual orders cancelled
    Closed,
}

impl PositionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionState::Closed)
    }
}

/// Watchdog bookkeeping for one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionWatch {
    pub symbol: Symbol,
    pub state: PositionState,
    pub consecutive_flat_checks: u32,
}

impl PositionWatch {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            state: PositionState::Opening,
            consecutive_flat_checks: 0,
        }
    }

    /// Record a flat reading, returns the updated streak
    pub fn observe_flat(&mut self) -> u32 {
        self.consecutive_flat_checks += 1;
        self.state = PositionState::Closing;
        self.consecutive_flat_checks
    }

    /// Record a non-flat reading; resets the flat streak
    pub fn observe_open(&mut self) {
        self.consecutive_flat_checks = 0;
        self.state = PositionState::Open;
    }

    pub fn mark_closed(&mut self) {
        self.state = PositionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_streak_resets_on_open_reading() {
        let mut watch = PositionWatch::new("BTCUSDT");
        assert_eq!(watch.state, PositionState::Opening);

        assert_eq!(watch.observe_flat(), 1);
        assert_eq!(watch.observe_flat(), 2);
        assert_eq!(watch.state, PositionState::Closing);

        watch.observe_open();
        assert_eq!(watch.consecutive_flat_checks, 0);
        assert_eq!(watch.state, PositionState::Open);

        assert_eq!(watch.observe_flat(), 1);
        watch.mark_closed();
        assert!(watch.state.is_terminal());
    }
}
