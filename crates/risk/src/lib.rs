//! Swarm Risk
//!
//! Turns a [`swarm_core::TradeIntent`] into a submittable
//! [`swarm_core::RiskOrder`]:
//!
//! - **RiskSizer**: quantity such that the loss at the stop never exceeds the
//!   risk budget, normalized to lot step and minimum size
//! - **VolatilityEstimator**: average true range over short and long periods,
//!   ratio clamped into a bounded stop multiplier
//! - **TradePlanner**: stop/target placement (explicit hints or
//!   volatility-scaled percentage) followed by sizing
//!
//! ## Architecture
//!
//! ```text
//! TradeIntent + live price + candles + constraints
//!          │
//!          ▼
//!   ┌──────────────┐   multiplier   ┌─────────────────────┐
//!   │ TradePlanner │◄───────────────│ VolatilityEstimator │
//!   └──────┬───────┘                └─────────────────────┘
//!          │ entry, stop
//!          ▼
//!   ┌──────────────┐
//!   │  RiskSizer   │──► quantity (0 = fail closed)
//!   └──────┬───────┘
//!          ▼
//!      RiskOrder
//! ```
//!
//! Nothing here performs I/O; candles and constraints are fetched by the
//! caller.

pub mod error;
pub mod planner;
pub mod sizer;
pub mod volatility;

// Re-export main types
pub use error::{Result, SizingError};
pub use planner::{PlannerConfig, TradePlanner};
pub use sizer::RiskSizer;
pub use volatility::VolatilityEstimator;
