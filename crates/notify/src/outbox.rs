//! Notification outbox
//!
//! Producers push text without ever waiting on the network. One worker drains
//! the queue, paced by the [`RateLimiter`], and gives each send a request
//! timeout. A full queue drops the message and counts it.

use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use swarm_clock::ShutdownSignal;
use swarm_ports::Notifier;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::rate_limiter::RateLimiter;

/// Outbox configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Sends per rolling minute
    pub max_per_minute: usize,
    /// Queued messages before new ones are dropped
    pub queue_capacity: usize,
    /// Request timeout per send
    pub send_timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_per_minute: 20,
            queue_capacity: 256,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl NotifyConfig {
    /// Builder: Set rate
    pub fn with_max_per_minute(mut self, max_per_minute: usize) -> Self {
        self.max_per_minute = max_per_minute;
        self
    }
}

/// Producer side; cheap to share behind an `Arc`
pub struct NotificationOutbox {
    tx: mpsc::Sender<String>,
    dropped: AtomicU64,
}

impl NotificationOutbox {
    /// Queue `text`; returns false when it was dropped
    pub fn push(&self, text: impl Into<String>) -> bool {
        match self.tx.try_send(text.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("[NOTIFY] outbox full, message dropped ({} so far)", dropped);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[NOTIFY] outbox closed, message discarded");
                false
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer side
pub struct OutboxWorker {
    rx: mpsc::Receiver<String>,
    notifier: Arc<dyn Notifier>,
    limiter: RateLimiter,
    send_timeout: Duration,
}

/// Create a connected outbox and worker
pub fn outbox(config: NotifyConfig, notifier: Arc<dyn Notifier>) -> (NotificationOutbox, OutboxWorker) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    (
        NotificationOutbox {
            tx,
            dropped: AtomicU64::new(0),
        },
        OutboxWorker {
            rx,
            notifier,
            limiter: RateLimiter::per_minute(config.max_per_minute),
            send_timeout: config.send_timeout,
        },
    )
}

impl OutboxWorker {
    /// Deliver until shutdown or until every producer is gone
    ///
    /// Returns the number of messages delivered.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> u64 {
        info!("[NOTIFY] outbox worker started ({})", self.notifier.name());
        let mut delivered = 0u64;

        loop {
            let text = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                next = self.rx.recv() => match next {
                    Some(text) => text,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = self.limiter.acquire() => {}
            }

            match tokio::time::timeout(self.send_timeout, self.notifier.send(&text)).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!("[NOTIFY] {} delivery failed: {}", self.notifier.name(), e),
                Err(_) => warn!(
                    "[NOTIFY] {} delivery timed out after {:?}",
                    self.notifier.name(),
                    self.send_timeout
                ),
            }
        }

        info!("[NOTIFY] outbox worker stopped after {} deliveries", delivered);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MemoryNotifier;
    use async_trait::async_trait;
    use swarm_clock::Shutdown;
    use swarm_ports::NotifyError;

    #[tokio::test(start_paused = true)]
    async fn test_delivers_in_order_until_producers_drop() {
        let _ = env_logger::try_init();
        let notifier = Arc::new(MemoryNotifier::new());
        let (outbox, worker) = outbox(NotifyConfig::default(), notifier.clone());

        assert!(outbox.push("first"));
        assert!(outbox.push("second"));
        drop(outbox);

        let delivered = worker.run(ShutdownSignal::never()).await;
        assert_eq!(delivered, 2);
        assert_eq!(notifier.messages(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_paces_delivery() {
        let notifier = Arc::new(MemoryNotifier::new());
        let config = NotifyConfig::default().with_max_per_minute(2);
        let (outbox, worker) = outbox(config, notifier.clone());
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(worker.run(shutdown.signal()));

        for i in 0..3 {
            outbox.push(format!("msg {}", i));
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(notifier.messages().len(), 2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(notifier.messages().len(), 3);

        shutdown.trigger();
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let notifier = Arc::new(MemoryNotifier::new());
        let config = NotifyConfig {
            queue_capacity: 1,
            ..NotifyConfig::default()
        };
        let (outbox, _worker) = outbox(config, notifier);

        assert!(outbox.push("kept"));
        assert!(!outbox.push("dropped"));
        assert_eq!(outbox.dropped_count(), 1);
    }

    struct Stalled;

    #[async_trait]
    impl Notifier for Stalled {
        async fn send(&self, _text: &str) -> Result<(), NotifyError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_channel_times_out() {
        let (outbox, worker) = outbox(NotifyConfig::default(), Arc::new(Stalled));
        outbox.push("never delivered");
        drop(outbox);

        assert_eq!(worker.run(ShutdownSignal::never()).await, 0);
    }
}
