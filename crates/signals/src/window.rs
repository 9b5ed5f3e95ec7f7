//! Rolling signal window
//!
//! Signals are appended in arrival order, which is also `received_at`
//! order, so expired entries are always at the front and eviction is a
//! sequence of `pop_front` calls. Eviction happens lazily, on read.

use chrono::Duration;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use swarm_core::{Signal, Timeframe, Timestamp};

/// Default hard cap on retained signals per window
pub const DEFAULT_WINDOW_CAPACITY: usize = 10_000;

/// Bounded, time-ordered signals for one timeframe
///
/// The deque is only touched under a short lock; readers receive an owned
/// copy and do all further work without holding it.
pub struct SignalWindow {
    timeframe: Timeframe,
    /// How far back a snapshot reaches
    window: Duration,
    /// Hard cap; the oldest entry is dropped once reached
    capacity: usize,
    signals: Mutex<VecDeque<Signal>>,
    /// Entries dropped because of the cap (not by time eviction)
    dropped: AtomicU64,
}

impl SignalWindow {
    pub fn new(timeframe: Timeframe, window: Duration) -> Self {
        Self::with_capacity(timeframe, window, DEFAULT_WINDOW_CAPACITY)
    }

    pub fn with_capacity(timeframe: Timeframe, window: Duration, capacity: usize) -> Self {
        Self {
            timeframe,
            window,
            capacity: capacity.max(1),
            signals: Mutex::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Insert a signal at the back
    pub fn append(&self, signal: Signal) {
        let mut signals = self.signals.lock();
        if signals.len() >= self.capacity {
            signals.pop_front();
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total.is_power_of_two() {
                warn!(
                    "[WINDOW] {} at capacity {}, {} signals dropped so far",
                    self.timeframe, self.capacity, total
                );
            }
        }
        signals.push_back(signal);
    }

    /// Evict expired signals and return a copy of the rest
    ///
    /// Never returns a signal with `received_at < now - window`.
    pub fn snapshot(&self, now: Timestamp) -> Vec<Signal> {
        let cutoff = now - self.window;
        let mut signals = self.signals.lock();

        let mut evicted = 0usize;
        while let Some(front) = signals.front() {
            if front.received_at < cutoff {
                signals.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }
        if evicted > 0 {
            debug!("[WINDOW] {} evicted {} expired signals", self.timeframe, evicted);
        }

        // A late-stamped straggler behind a newer entry must not leak out
        signals
            .iter()
            .filter(|s| s.received_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Number of retained signals, including any not yet evicted
    pub fn len(&self) -> usize {
        self.signals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.lock().is_empty()
    }

    /// Signals dropped because the capacity cap was hit
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use swarm_core::Direction;

    fn signal_at(at: Timestamp, symbol: &str) -> Signal {
        Signal::new(at, symbol, Direction::Up, Timeframe::M15)
    }

    #[test]
    fn test_empty_window_snapshot() {
        let window = SignalWindow::new(Timeframe::M15, Duration::minutes(60));
        assert!(window.snapshot(Utc::now()).is_empty());
        assert!(window.is_empty());
    }

    #[test]
    fn test_snapshot_evicts_expired_from_front() {
        let start = Utc::now();
        let window = SignalWindow::new(Timeframe::M15, Duration::minutes(60));

        window.append(signal_at(start, "BTC"));
        window.append(signal_at(start + Duration::minutes(30), "ETH"));
        window.append(signal_at(start + Duration::minutes(50), "SOL"));

        let snapshot = window.snapshot(start + Duration::minutes(70));
        let symbols: Vec<&str> = snapshot.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ETH", "SOL"]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_entry_exactly_at_cutoff_is_kept() {
        let start = Utc::now();
        let window = SignalWindow::new(Timeframe::M15, Duration::minutes(60));
        window.append(signal_at(start, "BTC"));

        assert_eq!(window.snapshot(start + Duration::minutes(60)).len(), 1);
        assert!(window.snapshot(start + Duration::minutes(61)).is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest_and_counts() {
        let start = Utc::now();
        let window = SignalWindow::with_capacity(Timeframe::M5, Duration::minutes(60), 3);

        for (i, symbol) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            window.append(signal_at(start + Duration::seconds(i as i64), symbol));
        }

        let snapshot = window.snapshot(start + Duration::seconds(10));
        let symbols: Vec<&str> = snapshot.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C", "D", "E"]);
        assert_eq!(window.dropped_count(), 2);
    }

    #[test]
    fn test_out_of_order_straggler_is_filtered() {
        let start = Utc::now();
        let window = SignalWindow::new(Timeframe::M15, Duration::minutes(60));
        window.append(signal_at(start + Duration::minutes(50), "NEW"));
        window.append(signal_at(start, "LATE"));

        let snapshot = window.snapshot(start + Duration::minutes(70));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].symbol, "NEW");
    }

    proptest! {
        #[test]
        fn prop_snapshot_never_returns_expired(
            offsets in proptest::collection::vec(0i64..7200, 0..60),
            reads in proptest::collection::vec(0i64..10800, 1..10),
        ) {
            let start = Utc::now();
            let window = SignalWindow::with_capacity(Timeframe::M15, Duration::minutes(60), 32);

            let mut offsets = offsets;
            offsets.sort_unstable();
            for (i, offset) in offsets.iter().enumerate() {
                window.append(signal_at(start + Duration::seconds(*offset), &format!("S{}", i)));
            }

            let mut reads = reads;
            reads.sort_unstable();
            for read in reads {
                let now = start + Duration::seconds(read);
                let cutoff = now - Duration::minutes(60);
                for signal in window.snapshot(now) {
                    prop_assert!(signal.received_at >= cutoff);
                }
            }
        }
    }
}
