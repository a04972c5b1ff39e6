//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::RelayHub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process-wide relay hub.
    pub hub: Arc<RelayHub>,
}

impl AppState {
    /// Wraps a hub for sharing across handlers.
    #[must_use]
    pub fn new(hub: RelayHub) -> Self {
        Self { hub: Arc::new(hub) }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RelayHub::new())
    }
}
