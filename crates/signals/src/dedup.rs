//! Duplicate delivery filter
//!
//! Alert sources retry deliveries. A repeat of the same `(symbol, direction)`
//! within a short window (seconds, not the cluster window) is the same
//! logical signal and is dropped.

use chrono::Duration;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use serde::{Deserialize, Serialize};
use swarm_core::{Direction, Signal, Symbol, Timestamp};

/// Identity of a logical signal for de-duplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub symbol: Symbol,
    pub direction: Direction,
}

impl DedupKey {
    pub fn of(signal: &Signal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
        }
    }
}

/// `(symbol, direction) -> last_seen_at`
pub struct DedupFilter {
    window: Duration,
    seen: DashMap<DedupKey, Timestamp>,
}

impl DedupFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: DashMap::new(),
        }
    }

    /// Record the signal and report whether it is a duplicate
    ///
    /// A duplicate does not refresh `last_seen_at`, so a steady stream of
    /// retries cannot keep a key suppressed forever.
    pub fn check_and_record(&self, signal: &Signal, now: Timestamp) -> bool {
        match self.seen.entry(DedupKey::of(signal)) {
            Entry::Occupied(mut occupied) => {
                let last_seen = *occupied.get();
                if now - last_seen < self.window {
                    debug!(
                        "[DISPATCH] duplicate {} {} ({}ms after previous)",
                        signal.symbol,
                        signal.direction,
                        (now - last_seen).num_milliseconds()
                    );
                    return true;
                }
                occupied.insert(now);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                false
            }
        }
    }

    /// Drop keys older than the window
    pub fn purge(&self, now: Timestamp) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, last_seen| now - *last_seen < self.window);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
