//! Audit recorders

use log::{info, warn};
use parking_lot::Mutex;
use swarm_ports::{AuditEvent, Recorder};

/// One JSON line per event on the `audit` log target
pub struct LogRecorder;

impl Recorder for LogRecorder {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => info!(target: "audit", "{}", line),
            Err(e) => warn!("[DISPATCH] audit event not serializable: {}", e),
        }
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use swarm_core::{Direction, NotifyEvent, Signal, Timeframe};

    #[test]
    fn test_memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        let signal = Signal::new(Utc::now(), "ETHUSDT", Direction::Up, Timeframe::M15);
        recorder.record(AuditEvent::SignalAccepted {
            signal: signal.clone(),
        });
        recorder.record(AuditEvent::SignalDuplicate { signal });

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AuditEvent::SignalAccepted { .. }));
        assert!(matches!(events[1], AuditEvent::SignalDuplicate { .. }));
    }

    #[test]
    fn test_audit_event_serializes_tagged() {
        let event = AuditEvent::SignalRejected {
            reason: "Missing field: ticker".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "signal_rejected");
    }

    #[test]
    fn test_cluster_event_keeps_its_payload_key() {
        let event = AuditEvent::ClusterNotified {
            event: NotifyEvent {
                timeframe: Timeframe::M15,
                direction: Direction::Down,
                symbols: ["BTCUSDT", "ETHUSDT"].iter().map(|s| s.to_string()).collect(),
                fired_at: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "cluster_notified");
        assert_eq!(json["event"]["symbols"].as_array().unwrap().len(), 2);
    }
}
