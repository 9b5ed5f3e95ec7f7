//! Sliding-window rate limiter
//!
//! Keeps the instants of the sends inside the window. A send is allowed while
//! fewer than `max_per_window` remain; otherwise the caller learns how long
//! until the oldest one leaves the window.

use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    /// Send instants, oldest first
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window: max_per_window.max(1),
            window,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// `max_per_minute` sends per rolling minute
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self::new(max_per_minute, Duration::from_secs(60))
    }

    /// Record a send if allowed, else return the wait until a slot frees
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut sent = self.sent.lock();

        while let Some(front) = sent.front() {
            if now.duration_since(*front) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }

        if sent.len() >= self.max_per_window {
            let wait = sent
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(wait);
        }

        sent.push_back(now);
        Ok(())
    }

    /// Wait for a slot and record the send
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    debug!("[NOTIFY] rate limit reached, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Sends currently inside the window
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        self.sent
            .lock()
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(limiter.try_acquire().is_ok());

        let wait = limiter.try_acquire().unwrap_err();
        assert_eq!(wait, Duration::from_secs(50));
        assert_eq!(limiter.in_window(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_frees_as_window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_slot() {
        let limiter = RateLimiter::new(1, Duration::from_secs(30));
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(limiter.in_window(), 1);
    }
}
