//! # finboard-core
//!
//! Types shared by every finboard crate:
//! - [`ids`]: branded string identifiers assigned by the backend
//! - [`models`]: user, file and analysis records mirrored from server responses
//! - [`events`]: push notifications received over the WebSocket channel
//! - [`signals`]: toasts and navigation requests addressed to the front end
//! - [`duration`]: human-readable execution times

#![deny(unsafe_code)]

pub mod duration;
pub mod events;
pub mod ids;
pub mod models;
pub mod signals;

pub use duration::format_duration_ms;
pub use events::PushEvent;
pub use ids::{AnalysisId, FileId, UserId};
pub use models::{AnalysisRecord, AnalysisStatus, FileStatus, UploadedFile, UserProfile};
pub use signals::{Toast, ToastLevel, UiSignal};
