use serde::{Deserialize, Serialize};

use crate::values::{Price, Timestamp};

/// OHLC candle as returned by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

impl Candle {
    pub fn new(open_time: Timestamp, open: Price, high: Price, low: Price, close: Price) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
        }
    }

    /// High minus low
    pub fn range(&self) -> Price {
        self.high.saturating_sub(self.low)
    }
}
