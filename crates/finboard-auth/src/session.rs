//! In-memory session with optional file persistence.

use std::fmt;
use std::path::{Path, PathBuf};

use finboard_core::{UserId, UserProfile};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::errors::SessionError;
use crate::storage::{SessionFile, load_session_file, remove_session_file, save_session_file};

/// An authenticated session: bearer token plus the profile snapshot.
pub struct Session {
    token: SecretString,
    /// Profile returned at login, if the server sent one.
    pub user: Option<UserProfile>,
}

impl Session {
    /// Build a session from a raw token.
    pub fn new(token: impl Into<String>, user: Option<UserProfile>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user,
        }
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Id of the logged-in user, when the profile is known.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    fn to_file(&self) -> SessionFile {
        SessionFile {
            auth_token: Some(self.token().to_owned()),
            user: self.user.clone(),
            last_updated: String::new(),
        }
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self::new(self.token(), self.user.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the current session.
///
/// Writers race with last-writer-wins semantics; every write is mirrored to
/// the backing file when one is configured.
pub struct SessionStore {
    path: Option<PathBuf>,
    state: RwLock<Option<Session>>,
}

impl SessionStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(None),
        }
    }

    /// A store backed by `path`, restoring any session already saved there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = load_session_file(&path).and_then(|file| {
            let token = file.auth_token.filter(|t| !t.is_empty())?;
            Some(Session::new(token, file.user))
        });
        if restored.is_some() {
            debug!(path = %path.display(), "restored persisted session");
        }
        Self {
            path: Some(path),
            state: RwLock::new(restored),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current bearer token.
    pub fn token(&self) -> Option<String> {
        self.state.read().as_ref().map(|s| s.token().to_owned())
    }

    /// Current user snapshot.
    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().as_ref().and_then(|s| s.user.clone())
    }

    /// Copy of the whole session.
    pub fn current(&self) -> Option<Session> {
        self.state.read().clone()
    }

    /// Whether a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_some()
    }

    /// Replace the session (login).
    ///
    /// The in-memory session is replaced even if persisting fails.
    pub fn save(&self, session: Session) -> Result<(), SessionError> {
        let mut file = session.to_file();
        *self.state.write() = Some(session);
        if let Some(path) = &self.path {
            save_session_file(path, &mut file)?;
        }
        Ok(())
    }

    /// Refresh the profile snapshot of the current session.
    ///
    /// Does nothing when logged out.
    pub fn update_user(&self, user: UserProfile) -> Result<(), SessionError> {
        let mut file = {
            let mut guard = self.state.write();
            let Some(session) = guard.as_mut() else {
                return Ok(());
            };
            session.user = Some(user);
            session.to_file()
        };
        if let Some(path) = &self.path {
            save_session_file(path, &mut file)?;
        }
        Ok(())
    }

    /// Drop the token and profile, and remove the backing file.
    ///
    /// Returns whether a session was held.
    pub fn clear(&self) -> Result<bool, SessionError> {
        let had_session = self.state.write().take().is_some();
        if let Some(path) = &self.path {
            remove_session_file(path)?;
        }
        if had_session {
            info!("session cleared");
        }
        Ok(had_session)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
