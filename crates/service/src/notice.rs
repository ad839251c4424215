//! Transient user-facing messages.
//!
//! Every form submission ends in a notice: a short message with a severity
//! the page uses to style it, dismissed after a delay.

use serde::Serialize;
use tracing::error;

use crate::errors::ServiceError;

pub const DEFAULT_DISMISS_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub dismiss_after_ms: u64,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into(), dismiss_after_ms: DEFAULT_DISMISS_MS }
    }

    pub fn success(message: impl Into<String>) -> Self { Self::new(Severity::Success, message) }
    pub fn info(message: impl Into<String>) -> Self { Self::new(Severity::Info, message) }
    pub fn warning(message: impl Into<String>) -> Self { Self::new(Severity::Warning, message) }
    pub fn error(message: impl Into<String>) -> Self { Self::new(Severity::Error, message) }

    pub fn dismiss_after(mut self, ms: u64) -> Self {
        self.dismiss_after_ms = ms;
        self
    }

    /// Client errors are shown as-is; a missing login is a warning; infrastructure
    /// failures are logged and replaced by a generic message.
    pub fn from_error(err: &ServiceError) -> Self {
        match err {
            ServiceError::PermissionDenied(msg) => Self::warning(msg.clone()),
            e if e.is_client_error() => Self::error(e.to_string()),
            e => {
                error!(code = e.code(), error = %e, "request failed");
                Self::error("something went wrong, please try again")
            }
        }
    }
}
