//! Shared application state.

use tokio::sync::Mutex;

use crate::registry::ConnectionRegistry;
use crate::store::DanmakuStore;

/// State shared by all connection handlers.
///
/// Each inbound message is routed to completion under these locks before
/// the next one from the same socket is taken, so no further locking
/// discipline is needed.
pub struct AppState {
    /// Live connections and their optional display names
    pub registry: Mutex<ConnectionRegistry>,
    /// Submitted danmaku, keyed by server-assigned id
    pub store: Mutex<DanmakuStore>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(ConnectionRegistry::new()),
            store: Mutex::new(DanmakuStore::new()),
        }
    }
}
