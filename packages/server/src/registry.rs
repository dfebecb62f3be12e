//! Connection registry: the set of live viewer connections.

use std::collections::HashMap;

use tokio::sync::mpsc;

/// Opaque handle identifying one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-connection state owned by the registry.
pub struct ClientHandle {
    /// Outbound message channel; the socket task drains it independently.
    pub sender: mpsc::UnboundedSender<String>,
    /// Display name from a `register` event. Set once, never mutated.
    pub name: Option<String>,
    /// Unix timestamp when connected (milliseconds)
    pub connected_at: i64,
}

/// Registry of live connections and their optional display names.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: HashMap<ConnId, ClientHandle>,
    next_id: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its handle id.
    pub fn add(&mut self, sender: mpsc::UnboundedSender<String>, connected_at: i64) -> ConnId {
        let id = ConnId(self.next_id);
        self.next_id += 1;
        self.clients.insert(
            id,
            ClientHandle {
                sender,
                name: None,
                connected_at,
            },
        );
        id
    }

    /// Remove a connection. Removing an unregistered id is a no-op.
    pub fn remove(&mut self, id: ConnId) {
        self.clients.remove(&id);
    }

    /// Number of currently registered connections.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Record the display name from a `register` event.
    ///
    /// A name is set once; a second registration keeps the first name.
    pub fn set_name(&mut self, id: ConnId, name: String) {
        match self.clients.get_mut(&id) {
            Some(handle) if handle.name.is_none() => {
                tracing::info!("Connection {} registered as '{}'", id, name);
                handle.name = Some(name);
            }
            Some(handle) => {
                tracing::warn!(
                    "Connection {} tried to re-register as '{}' (keeping '{}')",
                    id,
                    name,
                    handle.name.as_deref().unwrap_or_default()
                );
            }
            None => {
                tracing::warn!("Register for unknown connection {}", id);
            }
        }
    }

    /// Display name of a connection, if one was registered.
    pub fn name(&self, id: ConnId) -> Option<&str> {
        self.clients.get(&id).and_then(|handle| handle.name.as_deref())
    }

    /// Outbound sender of a connection, if it is registered.
    pub fn sender(&self, id: ConnId) -> Option<&mpsc::UnboundedSender<String>> {
        self.clients.get(&id).map(|handle| &handle.sender)
    }

    /// Iterate over all registered connections.
    pub fn iter(&self) -> impl Iterator<Item = (ConnId, &ClientHandle)> {
        self.clients.iter().map(|(id, handle)| (*id, handle))
    }
}
