use async_trait::async_trait;

use crate::error::NotifyError;

/// Outbound notification channel (Telegram, log, ...)
///
/// Callers go through the rate-limited outbox rather than calling this
/// directly.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    fn name(&self) -> &str {
        "Notifier"
    }
}
