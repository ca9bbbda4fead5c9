//! Connection manager: one supervised WebSocket per logged-in user.

use std::sync::Arc;
use std::time::Duration;

use finboard_core::{PushEvent, UserId};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::ReconnectPolicy;
use super::state::{ConnectionEvent, ConnectionState};
use crate::bus::{DEFAULT_CAPACITY, EventBus};
use crate::http::path_segment;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a graceful close may take before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns the push channel.
///
/// `connect` spawns a supervisor task that opens the socket, forwards
/// decoded events to the push bus and reconnects on close. Every write to
/// the shared state carries the generation it was started under; a
/// `connect` or `disconnect` bumps the generation, so tasks from an older
/// connection can neither change state nor schedule another attempt.
///
/// Must be used from inside a tokio runtime.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    ws_origin: String,
    policy: ReconnectPolicy,
    events: EventBus<PushEvent>,
    status: EventBus<ConnectionEvent>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    state: ConnectionState,
    active: Option<Active>,
}

struct Active {
    user_id: UserId,
    cancel: CancellationToken,
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    Closed,
    Cancelled,
}

impl ConnectionManager {
    /// Manager for sockets under `ws_origin` (e.g. `ws://localhost:8000`).
    pub fn new(
        ws_origin: impl Into<String>,
        policy: ReconnectPolicy,
        events: EventBus<PushEvent>,
    ) -> Self {
        let ws_origin = ws_origin.into().trim_end_matches('/').to_string();
        Self {
            shared: Arc::new(Shared {
                ws_origin,
                policy,
                events,
                status: EventBus::new(DEFAULT_CAPACITY),
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Socket URL for a user, or `None` when the id cannot name a path
    /// segment.
    pub fn endpoint(&self, user_id: &UserId) -> Option<String> {
        let segment = path_segment(user_id.as_str())?;
        Some(format!("{}/ws/{segment}", self.shared.ws_origin))
    }

    /// Open the push channel for `user_id`, replacing any existing one.
    ///
    /// An id that cannot name a path segment (blank, `.` or `..`) is ignored.
    pub fn connect(&self, user_id: &UserId) {
        let Some(url) = self.endpoint(user_id) else {
            debug!(user_id = %user_id, "push channel connect skipped: unusable user id");
            return;
        };
        let cancel = CancellationToken::new();

        let generation = {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            let previous = inner.active.replace(Active {
                user_id: user_id.clone(),
                cancel: cancel.clone(),
            });
            if let Some(previous) = previous {
                debug!(user_id = %previous.user_id, "replacing push channel");
                previous.cancel.cancel();
            }
            self.shared.set_state(&mut inner, ConnectionState::Connecting);
            inner.generation
        };

        info!(user_id = %user_id, url = %url, "push channel connecting");
        let _ = tokio::spawn(supervise(Arc::clone(&self.shared), generation, url, cancel));
    }

    /// Close the socket and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        let mut inner = self.shared.inner.lock();
        inner.generation += 1;
        if let Some(active) = inner.active.take() {
            active.cancel.cancel();
            info!(user_id = %active.user_id, "push channel disconnected");
        }
        self.shared.set_state(&mut inner, ConnectionState::Disconnected);
    }

    /// Decode a raw frame and publish it on the push bus.
    ///
    /// Malformed and unknown payloads are logged and dropped.
    pub fn on_message(&self, raw: &str) -> Option<PushEvent> {
        self.shared.dispatch(raw)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// User the channel is open (or opening) for.
    pub fn user_id(&self) -> Option<UserId> {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .map(|a| a.user_id.clone())
    }

    /// Reconnect policy in use.
    pub fn policy(&self) -> ReconnectPolicy {
        self.shared.policy
    }

    /// Bus decoded push events are published to.
    pub fn events(&self) -> &EventBus<PushEvent> {
        &self.shared.events
    }

    /// Subscribe to state changes and scheduled reconnects.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.status.subscribe()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Shared {
    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "push channel state");
            inner.state = state;
            let _ = self.status.publish(ConnectionEvent::StateChanged(state));
        }
    }

    /// Apply `state` if `generation` is still current.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        self.set_state(&mut inner, state);
        true
    }

    fn announce_retry(&self, generation: u64, attempt: u32, delay: Duration) -> bool {
        let inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "push channel reconnect scheduled"
        );
        let _ = self
            .status
            .publish(ConnectionEvent::ReconnectScheduled { attempt, delay });
        true
    }

    fn give_up(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        warn!(
            max_attempts = self.policy.max_attempts,
            "push channel reconnect attempts exhausted"
        );
        inner.active = None;
        self.set_state(&mut inner, ConnectionState::Dead);
    }

    fn dispatch(&self, raw: &str) -> Option<PushEvent> {
        match PushEvent::parse(raw) {
            Ok(PushEvent::Unknown) => {
                debug!(payload = raw, "ignoring push event of unknown type");
                None
            }
            Ok(event) => {
                debug!(kind = event.kind(), "push event");
                let _ = self.events.publish(event.clone());
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, len = raw.len(), "dropping malformed push message");
                None
            }
        }
    }

    async fn pump(&self, mut stream: WsStream, cancel: &CancellationToken) -> PumpExit {
        loop {
            let frame = tokio::select! {
                () = cancel.cancelled() => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await;
                    return PumpExit::Cancelled;
                }
                frame = stream.next() => frame,
            };
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = self.dispatch(text.as_str());
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        let _ = self.dispatch(text);
                    }
                    Err(e) => warn!(error = %e, "dropping non-UTF-8 push frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "push channel close frame");
                    return PumpExit::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "push channel read error");
                    return PumpExit::Closed;
                }
                None => return PumpExit::Closed,
            }
        }
    }
}

/// Supervisor loop for one connection generation.
async fn supervise(
    shared: Arc<Shared>,
    generation: u64,
    url: String,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    loop {
        if !shared.transition(generation, ConnectionState::Connecting) {
            return;
        }
        let opened = tokio::select! {
            () = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        // A failed open counts as a close.
        match opened {
            Ok((stream, _response)) => {
                if !shared.transition(generation, ConnectionState::Connected) {
                    return;
                }
                attempt = 0;
                info!(url = %url, "push channel open");
                if shared.pump(stream, &cancel).await == PumpExit::Cancelled {
                    return;
                }
                info!(url = %url, "push channel closed");
            }
            Err(e) => warn!(url = %url, error = %e, "push channel failed to open"),
        }

        if !shared.transition(generation, ConnectionState::Disconnected) {
            return;
        }
        attempt += 1;
        let Some(delay) = shared.policy.delay_for(attempt) else {
            shared.give_up(generation);
            return;
        };
        if !shared.announce_retry(generation, attempt, delay) {
            return;
        }
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
