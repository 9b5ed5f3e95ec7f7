//! Swarm Signals
//!
//! Everything between a normalized [`swarm_core::Signal`] and a cluster
//! decision:
//!
//! - **SignalWindow**: per-timeframe, time-ordered, bounded collection with
//!   lazy eviction; readers get an owned snapshot
//! - **ClusterDetector**: distinct-symbol threshold, notify/trade cooldowns and
//!   composition-change suppression, one state per direction
//! - **DedupFilter**: drops repeated deliveries of the same `(symbol, direction)`
//! - **ConfluenceDetector**: same symbol and direction on two paired timeframes
//!
//! ## Architecture
//!
//! ```text
//! Signal ──► DedupFilter ──► SignalWindow (per timeframe)
//!                                 │ snapshot(now)
//!                                 ▼
//!                          ClusterDetector ──► NotifyEvent / ClusterTrade
//!
//! Signal ──► ConfluenceDetector (partner window snapshot) ──► ConfluenceEvent
//! ```

pub mod cluster;
pub mod confluence;
pub mod dedup;
pub mod error;
pub mod window;

// Re-export main types
pub use cluster::{ClusterDecision, ClusterDetector, ClusterParams, ClusterState, ClusterTrade};
pub use confluence::{ConfluenceConfig, ConfluenceDetector};
pub use dedup::{DedupFilter, DedupKey};
pub use error::{IngestResult, ValidationError};
pub use window::SignalWindow;
