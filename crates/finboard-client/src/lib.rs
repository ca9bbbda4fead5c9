//! # finboard-client
//!
//! Client layer of the finboard analysis platform.
//!
//! - [`http`]: authenticated request client with the response interceptor
//! - [`api`]: typed auth, file and analysis endpoints
//! - [`realtime`]: reconnecting WebSocket push channel
//! - [`board`]: analysis and file records kept in sync with push events
//! - [`bus`]: broadcast buses connecting the pieces
//! - [`platform`]: composition root owning all of the above

#![deny(unsafe_code)]

pub mod api;
pub mod board;
pub mod bus;
pub mod errors;
pub mod http;
pub mod platform;
pub mod realtime;

pub use board::AnalysisBoard;
pub use bus::EventBus;
pub use errors::ApiError;
pub use http::RequestClient;
pub use platform::Platform;
pub use realtime::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy};
