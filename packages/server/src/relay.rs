//! Broadcast relay: fan one event out to every registered connection.

use kodou_shared::protocol::Event;

use crate::registry::{ConnId, ConnectionRegistry};

/// Broadcast an event to every registered connection, including the sender.
///
/// The event is serialized once and the identical bytes are queued for each
/// connection. A failed send only affects that connection; the loop keeps
/// going. Returns the number of connections the payload was queued for.
pub fn broadcast(registry: &ConnectionRegistry, event: &Event) -> usize {
    broadcast_raw(registry, &event.to_json())
}

/// Broadcast an already-serialized document to every registered connection.
///
/// Used by the passthrough path so forwarded messages keep their original
/// bytes, unknown fields included.
pub fn broadcast_raw(registry: &ConnectionRegistry, payload: &str) -> usize {
    let mut delivered = 0;
    for (id, handle) in registry.iter() {
        if handle.sender.send(payload.to_string()).is_err() {
            tracing::warn!("Failed to queue broadcast for connection {}", id);
        } else {
            delivered += 1;
        }
    }
    delivered
}

/// Send an event to a single connection. Returns whether it was queued.
pub fn send_to(registry: &ConnectionRegistry, id: ConnId, event: &Event) -> bool {
    match registry.sender(id) {
        Some(sender) => {
            if sender.send(event.to_json()).is_err() {
                tracing::warn!("Failed to queue reply for connection {}", id);
                false
            } else {
                true
            }
        }
        None => {
            tracing::warn!("Reply target {} is not registered", id);
            false
        }
    }
}
