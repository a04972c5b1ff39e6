//! Type-safe session identifier.
//!
//! [`SessionId`] is a newtype wrapper around the `u64` handed out by the
//! hub's connection counter, so session ids cannot be confused with other
//! integers (queue capacities, delivery counts).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one connected session.
///
/// Allocated once at connect time from the hub's counter and never reused
/// within a process lifetime. Serialized as a bare integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw counter value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SessionId> for u64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}
