//! Server-push channel for job-status notifications.
//!
//! A [`ConnectionManager`] keeps one WebSocket open per logged-in user,
//! decodes frames into [`PushEvent`](finboard_core::PushEvent)s and
//! reconnects with exponential backoff up to a fixed attempt ceiling.

mod manager;
mod policy;
mod state;

pub use manager::ConnectionManager;
pub use policy::ReconnectPolicy;
pub use state::{ConnectionEvent, ConnectionState};
