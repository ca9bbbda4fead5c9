//! Broadcast bus used for push events, UI signals and connection status.

use tokio::sync::broadcast;

/// Default channel capacity when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// Multi-producer, multi-consumer event fan-out.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is simply dropped. Slow subscribers lag and skip ahead.
#[derive(Debug)]
pub struct EventBus<T> {
    tx: broadcast::Sender<T>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: T) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receive the next event, skipping over lag.
///
/// Returns `None` once every sender is gone.
pub async fn recv_lossy<T: Clone>(rx: &mut broadcast::Receiver<T>, subscriber: &str) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(subscriber, lagged = n, "event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
