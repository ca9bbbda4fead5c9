//! Request client errors and their user-facing classification.

use std::time::Duration;

use finboard_core::Toast;
use serde_json::Value;

/// Typed failure of an HTTP call.
///
/// Every variant is returned to the caller; [`ApiError::toast`] decides
/// which ones are also announced to the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response: DNS, connect or read failure.
    #[error("network error: {0}")]
    Network(String),
    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// 401: credentials missing, expired or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// 403.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// 429.
    #[error("rate limited")]
    RateLimited {
        /// Server-suggested wait from `Retry-After`.
        retry_after: Option<Duration>,
    },
    /// 5xx.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Message extracted from the body.
        message: String,
    },
    /// Any other non-success status, left to the caller (form-level messages).
    #[error("request failed ({status}): {message}")]
    Http {
        /// HTTP status.
        status: u16,
        /// Message extracted from the body.
        message: String,
    },
    /// Success status but the body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
    /// A required field was empty; nothing was sent.
    #[error("{0} is required")]
    Validation(&'static str),
    /// The request could not be built (bad URL, bad multipart part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Local file could not be read for upload.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = extract_message(body);
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            429 => Self::RateLimited { retry_after },
            500..=599 => Self::Server { status, message },
            _ => Self::Http { status, message },
        }
    }

    /// Classify a transport failure.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure invalidates the stored session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::RateLimited { .. } => "rate_limited",
            Self::Server { .. } => "server_error",
            Self::Http { .. } => "http_error",
            Self::Decode(_) => "decode",
            Self::Validation(_) => "validation",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Io(_) => "io",
        }
    }

    /// The toast the interceptor shows for this failure, if any.
    ///
    /// 401 is handled by session expiry instead; other 4xx, decode and
    /// local errors are left to the caller.
    pub fn toast(&self) -> Option<Toast> {
        match self {
            Self::Network(_) | Self::Timeout => Some(Toast::error(
                "Unable to reach the server. Check your connection and try again.",
            )),
            Self::Forbidden(_) => Some(Toast::error(
                "You do not have permission to perform this action.",
            )),
            Self::RateLimited { .. } => Some(Toast::warning(
                "Too many requests. Please wait a moment and try again.",
            )),
            Self::Server { .. } => Some(Toast::error("Server error. Please try again later.")),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, `{"message": "..."}`, `{"error": "..."}`
/// and validation lists like `{"detail": [{"msg": "..."}]}`. Anything else
/// is returned trimmed as-is.
pub fn extract_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(message_from_value))
        .unwrap_or_else(|| trimmed.to_string())
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").or(Some(item)).and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
