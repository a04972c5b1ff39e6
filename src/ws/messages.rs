//! WebSocket wire frames.
//!
//! Every message is a JSON text frame `{"event": <name>, "data": <id>}`;
//! `data` is omitted for `send_piine`.

use serde::{Deserialize, Serialize};

use crate::domain::{RelayEvent, SessionId};
use crate::error::RelayError;

/// Event names understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    /// Client → relay: broadcast a piine.
    SendPiine,
    /// Relay → client: a peer sent a piine.
    ReceivePiine,
    /// Relay → client: a peer connected.
    Join,
    /// Relay → client: a peer disconnected.
    Leave,
}

impl EventName {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendPiine => "send_piine",
            Self::ReceivePiine => "receive_piine",
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

/// A single wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Event discriminator.
    pub event: EventName,
    /// Session id carried by relay → client events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SessionId>,
}

impl Frame {
    /// The only frame a client sends.
    #[must_use]
    pub const fn send_piine() -> Self {
        Self {
            event: EventName::SendPiine,
            data: None,
        }
    }

    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedFrame`] if `text` is not a JSON object
    /// with a known `event` name.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes the frame as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedFrame`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RelayError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<RelayEvent> for Frame {
    fn from(event: RelayEvent) -> Self {
        let (name, id) = match event {
            RelayEvent::Join(id) => (EventName::Join, id),
            RelayEvent::Leave(id) => (EventName::Leave, id),
            RelayEvent::Ping(id) => (EventName::ReceivePiine, id),
        };
        Self {
            event: name,
            data: Some(id),
        }
    }
}

impl TryFrom<Frame> for RelayEvent {
    type Error = RelayError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let id = || {
            frame.data.ok_or_else(|| {
                RelayError::MalformedFrame(format!("{} without session id", frame.event.as_str()))
            })
        };
        match frame.event {
            EventName::Join => Ok(Self::Join(id()?)),
            EventName::Leave => Ok(Self::Leave(id()?)),
            EventName::ReceivePiine => Ok(Self::Ping(id()?)),
            EventName::SendPiine => Err(RelayError::UnexpectedEvent(
                EventName::SendPiine.as_str().to_string(),
            )),
        }
    }
}

/// Commands a client may send to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Broadcast a piine to every other session.
    SendPiine,
}

impl ClientCommand {
    /// Decodes a client text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedFrame`] for undecodable text and
    /// [`RelayError::UnexpectedEvent`] for relay → client event names.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let frame = Frame::parse(text)?;
        match frame.event {
            EventName::SendPiine => Ok(Self::SendPiine),
            other => Err(RelayError::UnexpectedEvent(other.as_str().to_string())),
        }
    }
}
