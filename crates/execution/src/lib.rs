//! Swarm Execution
//!
//! Everything that touches the exchange once a trade is sized:
//! - **OrderExecutor**: market entry, reduce-only take-profit, live-price
//!   stop correction, trigger-based stop-loss, watchdog hand-off
//! - **PositionWatchdog**: polls the position until it is confirmed flat,
//!   then cancels every residual order on the symbol
//! - **WatchdogLauncher**: one watchdog per symbol, all bound to the process
//!   shutdown signal
//!
//! ## Architecture
//!
//! ```text
//! RiskOrder ──► OrderExecutor
//!                  │ 1. market entry        (abort on failure)
//!                  │ 2. last price          (best effort)
//!                  │ 3. reduce-only limit @ target
//!                  │ 4. correct stop against live price
//!                  │ 5. reduce-only conditional @ stop
//!                  │ 6. start watchdog      (always, once entry filled)
//!                  ▼
//!            WatchdogLauncher ──► PositionWatchdog (ScheduledTask)
//!                                   OPENING → OPEN → CLOSING → CLOSED
//!                                                        │
//!                                                        ▼
//!                                               cancel_all_orders(symbol)
//! ```

pub mod error;
pub mod executor;
pub mod watchdog;

// Re-export main types
pub use error::{TradeError, TradeStage};
pub use executor::{ExecutionConfig, ExecutionReport, OrderExecutor};
pub use watchdog::{PositionWatchdog, WatchdogConfig, WatchdogLauncher};
