//! Domain events fanned out by the relay hub.
//!
//! Every hub operation produces one [`RelayEvent`] which is queued on the
//! outbound queues of all other sessions. The event's [`DeliveryClass`]
//! decides whether a saturated peer may drop it.

use super::SessionId;

/// How an event is delivered to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryClass {
    /// Queued for every live peer.
    Reliable,
    /// Dropped for a peer that already has too many pings pending.
    Volatile,
}

/// Event emitted by the hub towards the other sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayEvent {
    /// A session connected.
    Join(SessionId),
    /// A session disconnected.
    Leave(SessionId),
    /// A session sent a piine.
    Ping(SessionId),
}

impl RelayEvent {
    /// Returns the session the event originates from.
    #[must_use]
    pub const fn origin(&self) -> SessionId {
        match self {
            Self::Join(id) | Self::Leave(id) | Self::Ping(id) => *id,
        }
    }

    /// Presence changes are reliable, pings are volatile.
    #[must_use]
    pub const fn delivery(&self) -> DeliveryClass {
        match self {
            Self::Join(_) | Self::Leave(_) => DeliveryClass::Reliable,
            Self::Ping(_) => DeliveryClass::Volatile,
        }
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Peers the event was queued for.
    pub delivered: usize,
    /// Peers the event was dropped for (saturated or closed session).
    pub dropped: usize,
}

impl Delivery {
    /// Total number of peers the broadcast targeted.
    #[must_use]
    pub const fn peers(&self) -> usize {
        self.delivered + self.dropped
    }

    pub(crate) fn record(&mut self, queued: bool) {
        if queued {
            self.delivered += 1;
        } else {
            self.dropped += 1;
        }
    }
}
