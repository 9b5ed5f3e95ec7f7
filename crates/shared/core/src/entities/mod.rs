mod candle;
mod direction;
mod order;
mod position;
mod risk_order;
mod side;
mod signal;
mod timeframe;

pub use candle::Candle;
pub use direction::{Direction, ParseDirectionError};
pub use order::{ConditionalOrder, LimitOrder, MarketOrder, OrderAck, TriggerDirection};
pub use position::{PositionState, PositionWatch};
pub use risk_order::RiskOrder;
pub use side::Side;
pub use signal::{Signal, SignalKind};
pub use timeframe::{ParseTimeframeError, Timeframe};
