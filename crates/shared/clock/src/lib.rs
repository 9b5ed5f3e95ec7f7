//! Swarm Clock Infrastructure
//!
//! Time sources and the runtime for long-lived background loops:
//!
//! - [`SystemClock`] - wall-clock time for production
//! - [`ManualClock`] - time that only moves when a test advances it
//! - [`ScheduledTask`] / [`run_scheduled`] - cancellable periodic tasks with an
//!   explicit `tick`, so tests can drive a loop one iteration at a time
//!
//! ## Usage
//!
//! ```ignore
//! use swarm_clock::{Schedule, Shutdown, run_scheduled};
//! use std::time::Duration;
//!
//! let shutdown = Shutdown::new();
//! let schedule = Schedule::every(Duration::from_secs(60)).with_max_ticks(100);
//! tokio::spawn(run_scheduled(my_task, schedule, shutdown.signal(), None));
//!
//! // later
//! shutdown.trigger();
//! ```

mod manual;
mod schedule;
mod shutdown;
mod system;

pub use manual::ManualClock;
pub use schedule::{RunSummary, Schedule, ScheduledTask, StopReason, TaskError, TickOutcome, run_scheduled};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use swarm_ports::Clock;
