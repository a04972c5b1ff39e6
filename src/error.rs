//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. None of its
//! variants are ever reported to connected clients: a failed delivery
//! degrades to "that peer didn't get the notification".

use crate::domain::SessionId;

/// Server- and client-side error enum.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Event received for a session that is not (or no longer) registered.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// Inbound frame could not be decoded.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A well-formed frame carrying an event the receiver does not accept.
    #[error("unexpected event: {0}")]
    UnexpectedEvent(String),

    /// Environment configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket bind or serve failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport failure on the client side.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Returns `true` for errors that only mean "ignore this event".
    ///
    /// The connection loop logs these at `debug` and keeps running.
    #[must_use]
    pub const fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::UnknownSession(_) | Self::MalformedFrame(_) | Self::UnexpectedEvent(_)
        )
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
