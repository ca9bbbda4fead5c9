//! # finboard-auth
//!
//! Owned session state for the finboard client: the bearer token and the
//! user profile snapshot returned by login.
//!
//! The session lives in a single [`SessionStore`] that is constructed once
//! and shared by reference. When backed by a file, every write is persisted
//! to `session.json` with 0600 permissions; logout removes the file.

#![deny(unsafe_code)]

pub mod errors;
pub mod session;
pub mod storage;

pub use errors::SessionError;
pub use session::{Session, SessionStore};
