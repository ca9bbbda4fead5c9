//! Session file I/O.
//!
//! The file holds the two values a browser client would keep in local
//! storage: the auth token and a serialized user profile.

use std::path::Path;

use finboard_core::UserProfile;
use serde::{Deserialize, Serialize};

use crate::errors::SessionError;

/// On-disk session document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionFile {
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Profile snapshot taken at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    /// RFC 3339 timestamp of the last write.
    #[serde(default)]
    pub last_updated: String,
}

/// Load the session file.
///
/// Returns `None` if the file doesn't exist or can't be parsed; a corrupt
/// file is treated as a logged-out state, not an error.
pub fn load_session_file(path: &Path) -> Option<SessionFile> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read session file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<SessionFile>(&data) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to parse session file: {e}");
            None
        }
    }
}

/// Write the session file, creating parent directories and setting 0600.
pub fn save_session_file(path: &Path, file: &mut SessionFile) -> Result<(), SessionError> {
    file.last_updated = chrono::Utc::now().to_rfc3339();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Delete the session file. Missing files are fine.
pub fn remove_session_file(path: &Path) -> Result<(), SessionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SessionError::Io(e)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
