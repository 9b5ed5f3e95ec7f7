use serde::Serialize;
use swarm_core::{ConfluenceEvent, NotifyEvent, RiskOrder, Signal, Timestamp, TradeIntent};

/// Result of one trade attempt, as written to the audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeOutcome {
    /// Entry filled with both protective orders resting
    Protected { order: RiskOrder },
    /// Entry filled but a protective order failed
    Unprotected {
        order: RiskOrder,
        failed_stage: String,
        error: String,
    },
    /// Nothing reached the exchange, or the entry was refused
    Aborted { stage: String, error: String },
    /// Not attempted (open position, cooldown, trading disabled)
    Skipped { reason: String },
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    SignalAccepted { signal: Signal },
    SignalDuplicate { signal: Signal },
    SignalRejected { reason: String, at: Timestamp },
    ClusterNotified { event: NotifyEvent },
    Confluence { event: ConfluenceEvent },
    TradeAttempt {
        intent: TradeIntent,
        outcome: TradeOutcome,
        at: Timestamp,
    },
}

/// Write-only sink for the audit trail
///
/// The storage format belongs to the implementation. `record` is called on
/// hot paths and must not block on I/O for long.
pub trait Recorder: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Recorder that discards everything
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record(&self, _event: AuditEvent) {}
}
