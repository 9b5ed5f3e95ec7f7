use std::fmt;
use thiserror::Error;

/// How a gateway failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network failure or timeout; safe to retry under a bounded policy
    Transient,
    /// The exchange refused the request; never retried
    Rejected,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayErrorKind::Transient => f.write_str("transient"),
            GatewayErrorKind::Rejected => f.write_str("rejected"),
        }
    }
}

/// Structured failure from an exchange call (code + message)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} [{code}]: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    /// Exchange or transport error code
    pub code: String,
    pub message: String,
}

impl GatewayError {
    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Transient,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Rejected,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A call that did not complete within its request timeout
    pub fn timeout(operation: &str) -> Self {
        Self::transient("timeout", format!("{} timed out", operation))
    }

    pub fn is_transient(&self) -> bool {
        self.kind == GatewayErrorKind::Transient
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Notification channel failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Timeout delivering notification")]
    Timeout,
}
