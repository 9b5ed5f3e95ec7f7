//! Bounded retry policy
//!
//! Every exchange call site goes through a [`RetryPolicy`]. Each attempt is
//! wrapped in a request timeout; only transient failures (network, timeout)
//! are retried, and never more than `max_attempts` times. A rejection is
//! returned immediately.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use swarm_ports::{GatewayError, GatewayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1)
    pub max_attempts: u32,
    /// Sleep after the first failed attempt
    pub initial_backoff: Duration,
    /// Backoff doubles up to this cap
    pub max_backoff: Duration,
    /// Request timeout for each attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(4),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with a request timeout
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Builder: Set attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Builder: Set backoff range
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Builder: Set per-attempt timeout
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Run `call` under this policy
    ///
    /// `operation` names the call in logs and timeout errors.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let error = match tokio::time::timeout(self.attempt_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => GatewayError::timeout(operation),
            };

            if attempt >= attempts {
                if attempts > 1 {
                    warn!(
                        "[RETRY] {} failed after {} attempts: {}",
                        operation, attempts, error
                    );
                }
                return Err(error);
            }

            debug!(
                "[RETRY] {} attempt {}/{} failed: {}, retrying in {:?}",
                operation, attempt, attempts, error, backoff
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.max_backoff);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let counter = calls.clone();
        let result = policy
            .run("get_last_price", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(GatewayError::transient("50001", "service busy"))
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default().with_max_attempts(5);

        let counter = calls.clone();
        let result: GatewayResult<()> = policy
            .run("place_market_order", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::rejected("51008", "insufficient margin"))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().code, "51008");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default().with_max_attempts(3);

        let counter = calls.clone();
        let result: GatewayResult<()> = policy
            .run("cancel_all_orders", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::transient("net", "connection reset"))
                }
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let policy = RetryPolicy::once(Duration::from_secs(1));

        let result: GatewayResult<()> = policy
            .run("get_candles", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, "timeout");
        assert!(err.message.contains("get_candles"));
    }
}
