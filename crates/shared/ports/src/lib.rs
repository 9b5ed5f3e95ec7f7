//! Swarm Ports
//!
//! Port definitions (traits) for the swarm trading system.
//! These define the boundaries between domain logic and the collaborators
//! it calls out to: the exchange, the notification channel, the audit sink
//! and the caller's event callbacks.

mod clock;
mod error;
mod gateway;
mod listener;
mod notifier;
mod recorder;

pub use clock::Clock;
pub use error::{GatewayError, GatewayErrorKind, GatewayResult, NotifyError};
pub use gateway::ExchangeGateway;
pub use listener::{EventListener, NoopListener};
pub use notifier::Notifier;
pub use recorder::{AuditEvent, NullRecorder, Recorder, TradeOutcome};
