//! Signals addressed to whatever front end renders the client state.

use serde::{Deserialize, Serialize};

/// Severity of a toast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    /// Neutral progress information.
    Info,
    /// A job finished successfully.
    Success,
    /// Recoverable problem.
    Warning,
    /// Failure the user should know about.
    Error,
}

/// A transient, non-blocking notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Message text.
    pub message: String,
}

impl Toast {
    /// Info toast.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    /// Success toast.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    /// Warning toast.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Warning,
            message: message.into(),
        }
    }

    /// Error toast.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Side effects requested by the client layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum UiSignal {
    /// Show a toast.
    Toast(Toast),
    /// Stored credentials were rejected; the front end should navigate to login.
    SessionExpired,
}
