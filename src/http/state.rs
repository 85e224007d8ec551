use crate::inventory::Inventory;
use crate::session::SessionManager;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one recording slot
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        self.sessions.inventory()
    }
}
