//! # finboard-settings
//!
//! Client configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** - [`FinboardSettings::default()`]
//! 2. **User file** - `~/.finboard/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** - `FINBOARD_*` overrides (highest priority)
//!
//! There is no global instance: the binary loads settings once and passes
//! them to the platform it builds.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_overrides, data_dir, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
