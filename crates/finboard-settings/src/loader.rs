//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FinboardSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `FINBOARD_*` overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{FinboardSettings, MAX_RECONNECT_ATTEMPTS};

/// Directory holding the settings and session files (`~/.finboard`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".finboard")
}

/// Default settings file (`~/.finboard/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FinboardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that fail
/// validation are errors.
pub fn load_settings_from_path(path: &Path) -> Result<FinboardSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<FinboardSettings> {
    let defaults = serde_json::to_value(FinboardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key with `source` winning; arrays and primitives are
/// replaced wholesale; `null` in `source` keeps the `target` value.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `FINBOARD_*` overrides read through `lookup`.
///
/// Empty values are ignored; unparsable values are logged and ignored.
pub fn apply_overrides<F>(settings: &mut FinboardSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = read("FINBOARD_API_URL") {
        settings.api.base_url = v;
    }
    if let Some(v) = read("FINBOARD_WS_URL") {
        settings.api.ws_url = v;
    }
    if let Some(v) = read("FINBOARD_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(n) => settings.api.timeout_ms = n,
            None => warn!(key = "FINBOARD_TIMEOUT_MS", value = %v, "invalid value, ignoring"),
        }
    }
    if let Some(v) = read("FINBOARD_MAX_RECONNECTS") {
        let ceiling = parse_u64_range(&v, 0, u64::from(MAX_RECONNECT_ATTEMPTS))
            .and_then(|n| u32::try_from(n).ok());
        match ceiling {
            Some(n) => settings.realtime.max_reconnect_attempts = n,
            None => warn!(key = "FINBOARD_MAX_RECONNECTS", value = %v, "invalid value, ignoring"),
        }
    }
    if let Some(v) = read("FINBOARD_SESSION_FILE") {
        settings.session.path = Some(PathBuf::from(v));
    }
    if let Some(v) = read("FINBOARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("FINBOARD_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn!(key = "FINBOARD_LOG_JSON", value = %v, "invalid boolean, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
