//! Per-session outbound queue.
//!
//! The hub keeps one [`SessionHandle`] per live session and the connection
//! task owns the matching [`SessionOutbox`]. All events for a session travel
//! through one FIFO queue, so a peer always sees a sender's pings before its
//! `leave`. Pings are admitted only while fewer than the volatile capacity
//! are waiting; presence events are always admitted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use super::{DeliveryClass, RelayEvent, SessionId};

/// Maximum number of undelivered pings queued for one session.
pub const SESSION_VOLATILE_CAPACITY: usize = 64;

/// Creates the two halves of a session's outbound queue.
///
/// The queue itself is unbounded: presence events are never refused while
/// the session is open. A client that stops reading while its TCP window
/// stays full also stalls its own connection loop, so it is not detected
/// as gone and its queue grows with join/leave churn until the transport
/// reports the failure.
#[must_use]
pub fn session_channel(id: SessionId, volatile_capacity: usize) -> (SessionHandle, SessionOutbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending_pings = Arc::new(AtomicUsize::new(0));
    let handle = SessionHandle {
        id,
        queue: tx,
        pending_pings: Arc::clone(&pending_pings),
        volatile_capacity: volatile_capacity.max(1),
        closed: AtomicBool::new(false),
        dropped: AtomicU64::new(0),
    };
    let outbox = SessionOutbox {
        queue: rx,
        pending_pings,
    };
    (handle, outbox)
}

/// Hub-side view of a connected session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    queue: mpsc::UnboundedSender<RelayEvent>,
    /// Pings queued but not yet taken by the outbox.
    pending_pings: Arc<AtomicUsize>,
    volatile_capacity: usize,
    closed: AtomicBool,
    /// Count of events dropped because the session was saturated or closed.
    dropped: AtomicU64,
}

impl SessionHandle {
    /// Returns the session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Queues an event for this session without waiting.
    ///
    /// Returns `false` if the session is closed, or if a volatile event
    /// found the ping allowance used up. Either way the drop counter is
    /// incremented.
    pub fn send(&self, event: RelayEvent) -> bool {
        let queued = !self.is_closed()
            && match event.delivery() {
                DeliveryClass::Reliable => self.queue.send(event).is_ok(),
                DeliveryClass::Volatile => self.send_volatile(event),
            };
        if !queued {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queued
    }

    fn send_volatile(&self, event: RelayEvent) -> bool {
        let capacity = self.volatile_capacity;
        let reserved = self
            .pending_pings
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                (pending < capacity).then_some(pending + 1)
            })
            .is_ok();
        if !reserved {
            return false;
        }
        if self.queue.send(event).is_err() {
            let _ = self.pending_pings.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Marks the session as departed; later sends are refused.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Total events dropped for this session.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Connection-side receiving half of a session's queue.
#[derive(Debug)]
pub struct SessionOutbox {
    queue: mpsc::UnboundedReceiver<RelayEvent>,
    pending_pings: Arc<AtomicUsize>,
}

impl SessionOutbox {
    /// Waits for the next event, in the order it was queued.
    ///
    /// Returns `None` once the hub has released the session and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        let event = self.queue.recv().await?;
        self.settle(event);
        Some(event)
    }

    /// Returns an already-queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        let event = self.queue.try_recv().ok()?;
        self.settle(event);
        Some(event)
    }

    fn settle(&self, event: RelayEvent) {
        if event.delivery() == DeliveryClass::Volatile {
            let _ = self.pending_pings.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
