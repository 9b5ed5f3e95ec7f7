//! Swarm Notify
//!
//! Outbound notifications, decoupled from the paths that produce them:
//! - **NotificationOutbox**: non-blocking hand-off (`try_send`), drops and
//!   counts when the queue is full
//! - **OutboxWorker**: single consumer; waits on the rate limiter, then sends
//!   with a request timeout
//! - **RateLimiter**: sliding window of recent send instants
//! - **TelegramNotifier**, **LogNotifier**, **MemoryNotifier**: channels
//!
//! ## Architecture
//!
//! ```text
//! Dispatcher / ClusterLoop / TradeWorker
//!         │ push(text)          (never blocks)
//!    ┌────▼──────────────┐
//!    │ NotificationOutbox│ mpsc, bounded
//!    └────┬──────────────┘
//!    ┌────▼──────────────┐
//!    │   OutboxWorker    │ RateLimiter.acquire() → timeout(send)
//!    └────┬──────────────┘
//!         ▼
//!   dyn Notifier (Telegram | log | memory)
//! ```

pub mod channels;
pub mod outbox;
pub mod rate_limiter;

// Re-export main types
pub use channels::{LogNotifier, MemoryNotifier, TelegramNotifier};
pub use outbox::{NotificationOutbox, NotifyConfig, OutboxWorker, outbox};
pub use rate_limiter::RateLimiter;
