//! Raw protocol events as they arrive from the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::parcel::DataSubcategory;

/// The protocol event kinds the bridge knows how to classify.
///
/// Anything outside the known set lands in `Other` and classifies under
/// the General subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtocolEventKind {
    RoomCreate,
    RoomMember,
    RoomName,
    RoomTopic,
    RoomMessage,
    Presence,
    Typing,
    Receipt,
    Other(String),
}

impl ProtocolEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "m.room.create" => ProtocolEventKind::RoomCreate,
            "m.room.member" => ProtocolEventKind::RoomMember,
            "m.room.name" => ProtocolEventKind::RoomName,
            "m.room.topic" => ProtocolEventKind::RoomTopic,
            "m.room.message" => ProtocolEventKind::RoomMessage,
            "m.presence" => ProtocolEventKind::Presence,
            "m.typing" => ProtocolEventKind::Typing,
            "m.receipt" => ProtocolEventKind::Receipt,
            other => ProtocolEventKind::Other(other.to_string()),
        }
    }

    /// The protocol event type string.
    pub fn as_type(&self) -> &str {
        match self {
            ProtocolEventKind::RoomCreate => "m.room.create",
            ProtocolEventKind::RoomMember => "m.room.member",
            ProtocolEventKind::RoomName => "m.room.name",
            ProtocolEventKind::RoomTopic => "m.room.topic",
            ProtocolEventKind::RoomMessage => "m.room.message",
            ProtocolEventKind::Presence => "m.presence",
            ProtocolEventKind::Typing => "m.typing",
            ProtocolEventKind::Receipt => "m.receipt",
            ProtocolEventKind::Other(t) => t,
        }
    }

    /// The coarse event family this kind classifies under.
    pub fn subcategory(&self) -> DataSubcategory {
        match self {
            ProtocolEventKind::RoomCreate
            | ProtocolEventKind::RoomMember
            | ProtocolEventKind::RoomName
            | ProtocolEventKind::RoomTopic
            | ProtocolEventKind::RoomMessage => DataSubcategory::RoomEvents,
            ProtocolEventKind::Presence => DataSubcategory::Presence,
            ProtocolEventKind::Typing | ProtocolEventKind::Receipt => DataSubcategory::UserEvents,
            ProtocolEventKind::Other(_) => DataSubcategory::General,
        }
    }
}

impl fmt::Display for ProtocolEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_type())
    }
}

/// A raw event exactly as the transport delivered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RawEvent {
    /// Parse an event from transport bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(BridgeError::from)
    }

    /// Rehydrate an event from an envelope payload.
    pub fn from_payload(content: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(content.clone()).map_err(BridgeError::from)
    }

    pub fn kind(&self) -> ProtocolEventKind {
        ProtocolEventKind::from_type(&self.event_type)
    }

    /// The message content type, for `m.room.message` events.
    pub fn msgtype(&self) -> Option<&str> {
        self.content.get("msgtype").and_then(|v| v.as_str())
    }

    /// The membership action, for `m.room.member` events.
    pub fn membership(&self) -> Option<&str> {
        self.content.get("membership").and_then(|v| v.as_str())
    }
}
