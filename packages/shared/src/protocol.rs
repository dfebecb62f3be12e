//! Wire protocol shared by the relay server and the viewer clients.
//!
//! Every message is one JSON document: `{ "type": ..., "data": ..., "timestamp": ... }`.
//! The `data` shape is determined solely by `type`; typed payloads are
//! extracted at the dispatch boundary with [`Event::data_as`].

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Wire tag of an [`Event`].
///
/// Tags the server does not know are parsed as [`EventType::Unknown`] and
/// relayed verbatim instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Heartbeat,
    Interaction,
    Connect,
    Disconnect,
    Danmaku,
    ModeChange,
    DanmakuList,
    DanmakuListSync,
    DanmakuDelete,
    Register,
    Unknown,
}

impl EventType {
    /// Map a wire tag to its type; anything unrecognized is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "heartbeat" => EventType::Heartbeat,
            "interaction" => EventType::Interaction,
            "connect" => EventType::Connect,
            "disconnect" => EventType::Disconnect,
            "danmaku" => EventType::Danmaku,
            "modeChange" => EventType::ModeChange,
            "danmakuList" => EventType::DanmakuList,
            "danmakuListSync" => EventType::DanmakuListSync,
            "danmakuDelete" => EventType::DanmakuDelete,
            "register" => EventType::Register,
            _ => EventType::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(EventType::from_tag(&tag))
    }
}

/// Display mode of the heartbeat waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Excited,
    Death,
    Music,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Excited => "excited",
            Mode::Death => "death",
            Mode::Music => "music",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Mode::Normal),
            "excited" => Ok(Mode::Excited),
            "death" => Ok(Mode::Death),
            "music" => Ok(Mode::Music),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a stored danmaku entry. Advisory metadata; preserved as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanmakuStatus {
    #[default]
    Queued,
    Displaying,
    Done,
}

/// One danmaku message.
///
/// Submissions arrive without an `id`; the server assigns one on insert and
/// broadcasts the stored copy, so everything a viewer receives carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanmakuEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    pub content: String,
    pub timestamp: i64,
    #[serde(default)]
    pub is_quick_phrase: bool,
    #[serde(default)]
    pub status: DanmakuStatus,
}

/// Payload of a `register` event, sent once after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub user_id: String,
    pub name: String,
}

/// Payload of a `modeChange` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChangeData {
    pub mode: Mode,
}

/// Payload of a `danmakuDelete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanmakuDeleteData {
    pub id: String,
}

/// Payload of `connect` / `disconnect` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCountData {
    pub total_clients: usize,
}

/// One wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub r#type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: i64,
}

impl Event {
    pub fn new(r#type: EventType, data: Option<Value>, timestamp: i64) -> Self {
        Self {
            r#type,
            data,
            timestamp,
        }
    }

    pub fn heartbeat(timestamp: i64) -> Self {
        Self::new(EventType::Heartbeat, None, timestamp)
    }

    pub fn interaction(timestamp: i64) -> Self {
        Self::new(EventType::Interaction, None, timestamp)
    }

    pub fn connect(total_clients: usize, timestamp: i64) -> Self {
        Self::new(
            EventType::Connect,
            Some(serde_json::to_value(ClientCountData { total_clients }).unwrap()),
            timestamp,
        )
    }

    pub fn disconnect(total_clients: usize, timestamp: i64) -> Self {
        Self::new(
            EventType::Disconnect,
            Some(serde_json::to_value(ClientCountData { total_clients }).unwrap()),
            timestamp,
        )
    }

    pub fn danmaku(entry: &DanmakuEntry, timestamp: i64) -> Self {
        Self::new(
            EventType::Danmaku,
            Some(serde_json::to_value(entry).unwrap()),
            timestamp,
        )
    }

    pub fn mode_change(mode: Mode, timestamp: i64) -> Self {
        Self::new(
            EventType::ModeChange,
            Some(serde_json::to_value(ModeChangeData { mode }).unwrap()),
            timestamp,
        )
    }

    pub fn danmaku_list(timestamp: i64) -> Self {
        Self::new(EventType::DanmakuList, Some(Value::Object(Default::default())), timestamp)
    }

    pub fn danmaku_list_sync(entries: &[DanmakuEntry], timestamp: i64) -> Self {
        Self::new(
            EventType::DanmakuListSync,
            Some(serde_json::to_value(entries).unwrap()),
            timestamp,
        )
    }

    pub fn danmaku_delete(id: &str, timestamp: i64) -> Self {
        Self::new(
            EventType::DanmakuDelete,
            Some(serde_json::to_value(DanmakuDeleteData { id: id.to_string() }).unwrap()),
            timestamp,
        )
    }

    pub fn register(user_id: &str, name: &str, timestamp: i64) -> Self {
        Self::new(
            EventType::Register,
            Some(
                serde_json::to_value(RegisterData {
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                })
                .unwrap(),
            ),
            timestamp,
        )
    }

    /// Parse one wire document.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize to one wire document.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }

    /// Extract the typed payload for this event's `type`.
    ///
    /// An absent `data` field deserializes from JSON null, so payload structs
    /// with required fields report a proper error instead of panicking.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone().unwrap_or(Value::Null))
    }
}
