//! Swarm Core Domain
//!
//! Pure domain types for the swarm signal clustering and trading system.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod events;
pub mod instruments;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    Candle, ConditionalOrder, Direction, LimitOrder, MarketOrder, OrderAck, ParseDirectionError,
    ParseTimeframeError, PositionState, PositionWatch, RiskOrder, Side, Signal, SignalKind, Timeframe,
    TriggerDirection,
};
pub use events::{ConfluenceEvent, ConfluenceLeg, NotifyEvent, TradeIntent, TradeOrigin};
pub use instruments::InstrumentConstraints;
pub use values::{Price, Quantity, Symbol, Timestamp};
