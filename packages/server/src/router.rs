//! Inbound event dispatch.

use thiserror::Error;

use kodou_shared::protocol::{
    DanmakuDeleteData, DanmakuEntry, Event, EventType, RegisterData,
};
use kodou_shared::time::epoch_millis;

use crate::registry::ConnId;
use crate::relay;
use crate::state::AppState;

/// Why an inbound message was dropped.
///
/// Routing failures never close the connection; the socket task logs them
/// at `warn` and keeps reading.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unparseable event: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Dispatch one inbound document from `sender`.
///
/// - `register` records the sender's display name; nothing is broadcast.
/// - `danmaku` stores the submission and broadcasts the stored copy.
/// - `danmakuList` replies to the sender only with `danmakuListSync`.
/// - `danmakuDelete` removes the entry and broadcasts the deletion.
/// - Everything else, unknown tags included, is forwarded verbatim to all
///   connections.
pub async fn route(state: &AppState, sender: ConnId, raw: &str) -> Result<(), RouteError> {
    let event = Event::parse(raw).map_err(RouteError::Parse)?;

    match event.r#type {
        EventType::Register => {
            let payload: RegisterData = event.data_as().map_err(|source| RouteError::Payload {
                kind: "register",
                source,
            })?;
            let mut registry = state.registry.lock().await;
            registry.set_name(sender, payload.name);
        }
        EventType::Danmaku => {
            let draft: DanmakuEntry = event.data_as().map_err(|source| RouteError::Payload {
                kind: "danmaku",
                source,
            })?;
            let stored = {
                let mut store = state.store.lock().await;
                store.add(draft)
            };
            tracing::info!("Danmaku {} stored from connection {}", stored.id, sender);
            let registry = state.registry.lock().await;
            relay::broadcast(&registry, &Event::danmaku(&stored, epoch_millis()));
        }
        EventType::DanmakuList => {
            let entries = {
                let store = state.store.lock().await;
                store.get_all()
            };
            tracing::info!(
                "Sending danmaku list ({} entries) to connection {}",
                entries.len(),
                sender
            );
            let registry = state.registry.lock().await;
            relay::send_to(
                &registry,
                sender,
                &Event::danmaku_list_sync(&entries, epoch_millis()),
            );
        }
        EventType::DanmakuDelete => {
            let payload: DanmakuDeleteData =
                event.data_as().map_err(|source| RouteError::Payload {
                    kind: "danmakuDelete",
                    source,
                })?;
            let deleted = {
                let mut store = state.store.lock().await;
                store.delete(&payload.id)
            };
            if !deleted {
                tracing::debug!("Delete for unknown danmaku id '{}'", payload.id);
            }
            let registry = state.registry.lock().await;
            relay::broadcast(&registry, &Event::danmaku_delete(&payload.id, epoch_millis()));
        }
        // Forwarded verbatim so every viewer applies the same trigger. This
        // includes unknown tags: clients ignore what they don't understand.
        EventType::Heartbeat
        | EventType::Interaction
        | EventType::ModeChange
        | EventType::Connect
        | EventType::Disconnect
        | EventType::DanmakuListSync
        | EventType::Unknown => {
            let registry = state.registry.lock().await;
            relay::broadcast_raw(&registry, raw);
        }
    }

    Ok(())
}
