//! WebSocket layer: upgrade handling, the per-connection loop, and wire
//! frames.
//!
//! The relay endpoint is served at both `/` and `/ws`.

pub mod connection;
pub mod handler;
pub mod messages;
