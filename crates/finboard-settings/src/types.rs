//! Settings types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Highest reconnect ceiling; attempt `n` waits `2^n` units, which must fit a `u32`.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 31;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinboardSettings {
    /// Backend endpoints.
    pub api: ApiSettings,
    /// Push channel behavior.
    pub realtime: RealtimeSettings,
    /// Session persistence.
    pub session: SessionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl FinboardSettings {
    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "api.baseUrl must be an http(s) URL, got {base:?}"
            )));
        }
        let ws = self.api.ws_url.trim();
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            return Err(SettingsError::InvalidValue(format!(
                "api.wsUrl must be a ws(s) URL, got {ws:?}"
            )));
        }
        if self.api.timeout_ms == 0 {
            return Err(SettingsError::InvalidValue("api.timeoutMs must be > 0".into()));
        }
        if self.realtime.max_reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
            return Err(SettingsError::InvalidValue(format!(
                "realtime.maxReconnectAttempts must be at most {MAX_RECONNECT_ATTEMPTS}, got {}",
                self.realtime.max_reconnect_attempts
            )));
        }
        if self.realtime.event_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.eventBuffer must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Backend endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL every HTTP path is appended to.
    pub base_url: String,
    /// WebSocket origin; the push channel lives at `{wsUrl}/ws/{userId}`.
    pub ws_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ApiSettings {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Push channel behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// Unit of the reconnect backoff; attempt `n` waits `2^n` units.
    pub reconnect_base_ms: u64,
    /// Reconnect attempts before the channel is given up.
    pub max_reconnect_attempts: u32,
    /// Capacity of the in-process event buses.
    pub event_buffer: usize,
}

impl RealtimeSettings {
    /// Backoff unit as a [`Duration`].
    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            reconnect_base_ms: 1000,
            max_reconnect_attempts: 5,
            event_buffer: 256,
        }
    }
}

/// Session persistence.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Session file; `None` means `~/.finboard/session.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SessionSettings {
    /// Resolved session file path.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| crate::loader::data_dir().join("session.json"))
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
