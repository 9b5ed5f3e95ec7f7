//! Swarm Runner
//!
//! Orchestrates the signal clustering and trading system:
//!
//! - **Config**: defaults plus environment overrides
//! - **Payload**: alert JSON to normalized [`swarm_core::Signal`]
//! - **Dispatcher**: validation, dedup, windows, confluence, hand-off
//! - **ClusterLoop**: periodic (and signal-woken) cluster evaluation
//! - **TradeWorker**: intent to sized, protected position
//! - **Swarm**: wiring and lifecycle
//!
//! ## Architecture
//!
//! ```text
//!                        ┌─────────────────┐
//!                        │  Alert source   │
//!                        │ (JSON payloads) │
//!                        └────────┬────────┘
//!                                 │ AlertPayload → Signal
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          DISPATCHER                             │
//! │                                                                 │
//! │  DedupFilter ──► SignalWindow (per TF) ──► ConfluenceDetector   │
//! │                        │                                        │
//! │                        ▼  ClusterLoop (per TF)                  │
//! │                  ClusterDetector                                │
//! └──────────┬─────────────────────────────┬────────────────────────┘
//!            │ NotifyEvent                 │ TradeIntent
//!            ▼                             ▼
//! ┌───────────────────────┐     ┌───────────────────────┐
//! │  NotificationOutbox   │     │     Trade Worker      │
//! │  (rate limited)       │◄────│ planner → executor    │
//! └───────────┬───────────┘     └───────────┬───────────┘
//!             │                             │
//!             ▼                             ▼
//!        Notifier                  ExchangeGateway + PositionWatchdog
//! ```

pub mod cluster_loop;
pub mod config;
pub mod dispatcher;
pub mod payload;
pub mod recorder;
pub mod swarm;
pub mod trade_worker;

// Re-export main types
pub use cluster_loop::ClusterLoop;
pub use config::{ConfigError, DirectionPolicy, SwarmConfig, TelegramCredentials, TradingConfig};
pub use dispatcher::{Dispatcher, DispatcherParts};
pub use payload::{AlertPayload, SymbolStyle, normalize_ticker};
pub use recorder::{LogRecorder, MemoryRecorder};
pub use swarm::{Swarm, SwarmDeps, SwarmSummary};
pub use trade_worker::TradeWorker;
