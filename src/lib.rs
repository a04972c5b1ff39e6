//! # piine-relay
//!
//! Real-time WebSocket relay for "piine" notifications.
//!
//! Clients connect, are announced to everyone already connected, broadcast
//! a lightweight piine to all other clients, and are announced again when
//! they leave. The relay keeps no state beyond the live connections and a
//! session id counter.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)          Health checks (HTTP)
//!     │                              │
//!     ├── WS Handler (ws/)           ├── System Handlers (api/)
//!     │                              │
//!     └──────── RelayHub (domain/) ──┘
//!                  │
//!                  └── per-session ordered queues (pings droppable)
//! ```
//!
//! [`client::PiineClient`] implements the other end of the protocol.

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod ws;
