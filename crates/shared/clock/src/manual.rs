use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use swarm_core::Timestamp;
use swarm_ports::Clock;

/// Clock that only advances when told to
///
/// Used for deterministic tests of windows and cooldowns: nothing moves
/// unless [`ManualClock::advance`] or [`ManualClock::set_time`] is called.
pub struct ManualClock {
    current_time: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a new manual clock
    ///
    /// # Arguments
    /// * `initial_time` - Optional starting time. If None, uses current wall time.
    pub fn new(initial_time: Option<Timestamp>) -> Arc<Self> {
        Arc::new(Self {
            current_time: RwLock::new(initial_time.unwrap_or_else(Utc::now)),
        })
    }

    /// Advance the time by a specified duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current_time.write();
        *current += duration;
    }

    /// Explicitly set the time
    ///
    /// Warning: moving backwards breaks the arrival-order assumption of
    /// signal windows. Use with caution.
    pub fn set_time(&self, time: Timestamp) {
        *self.current_time.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current_time.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
