//! Swarm Gateway
//!
//! Plumbing around the [`swarm_ports::ExchangeGateway`] port:
//! - **RetryPolicy**: the one bounded-retry type shared by every exchange call
//!   site, with a per-attempt request timeout
//! - **PaperExchange**: an in-memory exchange that fills market orders at the
//!   last price and rests protective orders until price crosses them
//!
//! ## Architecture
//!
//! ```text
//! OrderExecutor / PositionWatchdog / TradeWorker
//!         │
//!    ┌────▼────────┐
//!    │ RetryPolicy │  timeout per attempt, backoff, transient-only
//!    └────┬────────┘
//!         │ dyn ExchangeGateway
//!    ┌────▼──────────────────┐
//!    │ PaperExchange │ venue │
//!    └───────────────────────┘
//! ```
//!
//! Live venue adapters (request signing, REST routing) plug in behind the
//! same trait.

pub mod paper;
pub mod retry;

// Re-export commonly used types
pub use paper::{CALL_LOG_LIMIT, PaperCall, PaperExchange};
pub use retry::RetryPolicy;
