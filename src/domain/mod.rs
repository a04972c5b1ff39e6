//! Domain layer: session identity, relay events, and the relay hub.
//!
//! This module contains the transport-independent core: the session id
//! newtype, the events the hub fans out, per-session outbound queues, and
//! the hub that assigns ids and broadcasts presence and pings.

pub mod relay_event;
pub mod relay_hub;
pub mod session;
pub mod session_id;

pub use relay_event::{Delivery, DeliveryClass, RelayEvent};
pub use relay_hub::RelayHub;
pub use session::{SessionHandle, SessionOutbox};
pub use session_id::SessionId;
