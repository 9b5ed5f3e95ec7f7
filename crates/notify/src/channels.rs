//! Notification channels

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::time::Duration;
use swarm_ports::{NotifyError, Notifier};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage`
///
/// Text goes out without a `parse_mode`: forwarded alerts and exchange error
/// text are not Markdown-safe, and Telegram refuses unbalanced entities.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Fails when either credential is empty
    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let token = token.into();
        let chat_id = chat_id.into();
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(NotifyError::NotConfigured(
                "telegram token and chat id are required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            base_url: TELEGRAM_API.to_string(),
            token,
            chat_id,
        })
    }

    /// Builder: Point at another Bot API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url.trim_end_matches('/'), self.token)
    }

    fn query<'a>(&'a self, text: &'a str) -> [(&'static str, &'a str); 2] {
        [("chat_id", self.chat_id.as_str()), ("text", text)]
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&self.query(text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Delivery(e.to_string())
                }
            })?;

        response
            .error_for_status()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        debug!("[NOTIFY] telegram message delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// Writes notifications to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "notify", "{}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Keeps every notification in memory
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_requires_credentials() {
        let err = TelegramNotifier::new("", "766363011", Duration::from_secs(5));
        assert!(matches!(err, Err(NotifyError::NotConfigured(_))));
    }

    #[test]
    fn test_telegram_endpoint() {
        let notifier = TelegramNotifier::new("123:abc", "42", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8081/");
        assert_eq!(notifier.endpoint(), "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[test]
    fn test_telegram_sends_plain_text() {
        let notifier = TelegramNotifier::new("123:abc", "42", Duration::from_secs(5)).unwrap();
        let text = "entry rejected: param_error *sz";
        let query = notifier.query(text);
        assert_eq!(query, [("chat_id", "42"), ("text", text)]);
        assert!(query.iter().all(|(key, _)| *key != "parse_mode"));
    }

    #[tokio::test]
    async fn test_memory_notifier_keeps_order() {
        let notifier = MemoryNotifier::new();
        notifier.send("one").await.unwrap();
        notifier.send("two").await.unwrap();
        assert_eq!(notifier.messages(), vec!["one", "two"]);
    }
}
