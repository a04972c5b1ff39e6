//! Connection registry and broadcast dispatcher.
//!
//! [`RelayHub`] owns the session counter and the live session set. Every
//! broadcast snapshots the peers under the lock, releases it, and then
//! queues the event on each peer without waiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use super::session::{SESSION_VOLATILE_CAPACITY, SessionHandle, SessionOutbox, session_channel};
use super::{Delivery, RelayEvent, SessionId};
use crate::error::RelayError;

/// Central registry of live sessions.
///
/// # Concurrency
///
/// - Ids are allocated under the write lock, so id order equals
///   registration order.
/// - Broadcasts hold the lock only while cloning the peer list.
/// - A session that joins or leaves mid-broadcast may be missed; no session
///   ever receives the same event twice.
#[derive(Debug)]
pub struct RelayHub {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
    volatile_capacity: usize,
}

impl RelayHub {
    /// Creates an empty hub whose counter starts at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_volatile_capacity(SESSION_VOLATILE_CAPACITY)
    }

    /// Creates an empty hub with a custom per-session pending ping limit.
    #[must_use]
    pub fn with_volatile_capacity(volatile_capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
            volatile_capacity,
        }
    }

    /// Registers a new session and announces it to everyone already here.
    ///
    /// The new session never receives its own `join`.
    pub async fn connect(&self) -> (SessionId, SessionOutbox) {
        let (id, outbox, peers) = {
            let mut map = self.sessions.write().await;
            let id = SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let peers: Vec<_> = map.values().map(Arc::clone).collect();
            let (handle, outbox) = session_channel(id, self.volatile_capacity);
            map.insert(id, Arc::new(handle));
            (id, outbox, peers)
        };

        let delivery = fan_out(&peers, RelayEvent::Join(id));
        tracing::info!(
            session_id = %id,
            peers = delivery.peers(),
            "session joined"
        );
        (id, outbox)
    }

    /// Broadcasts a piine from `id` to every other session.
    ///
    /// Peers that already have too many pings pending silently miss it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownSession`] if `id` is not registered; in
    /// that case nothing is broadcast.
    pub async fn ping(&self, id: SessionId) -> Result<Delivery, RelayError> {
        let peers = {
            let map = self.sessions.read().await;
            if !map.contains_key(&id) {
                return Err(RelayError::UnknownSession(id));
            }
            others(&map, id)
        };

        let delivery = fan_out(&peers, RelayEvent::Ping(id));
        tracing::info!(
            session_id = %id,
            delivered = delivery.delivered,
            dropped = delivery.dropped,
            "piine"
        );
        Ok(delivery)
    }

    /// Removes `id` and announces its departure to the remaining sessions.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownSession`] if `id` was already removed (or
    /// never registered); no second `leave` is broadcast.
    pub async fn disconnect(&self, id: SessionId) -> Result<Delivery, RelayError> {
        let (handle, peers) = {
            let mut map = self.sessions.write().await;
            let handle = map.remove(&id).ok_or(RelayError::UnknownSession(id))?;
            handle.close();
            (handle, map.values().map(Arc::clone).collect::<Vec<_>>())
        };

        let delivery = fan_out(&peers, RelayEvent::Leave(id));
        tracing::info!(
            session_id = %id,
            peers = delivery.peers(),
            dropped = handle.drop_count(),
            "session left"
        );
        Ok(delivery)
    }

    /// Returns the number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the id the next connection will be assigned.
    #[must_use]
    pub fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_id.load(Ordering::SeqCst))
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones every handle except `sender`.
fn others(
    map: &HashMap<SessionId, Arc<SessionHandle>>,
    sender: SessionId,
) -> Vec<Arc<SessionHandle>> {
    map.iter()
        .filter(|(id, _)| **id != sender)
        .map(|(_, handle)| Arc::clone(handle))
        .collect()
}

fn fan_out(peers: &[Arc<SessionHandle>], event: RelayEvent) -> Delivery {
    let mut delivery = Delivery::default();
    for peer in peers {
        let queued = peer.send(event);
        if !queued {
            tracing::debug!(
                session_id = %peer.id(),
                origin = %event.origin(),
                "event dropped for peer"
            );
        }
        delivery.record(queued);
    }
    delivery
}
