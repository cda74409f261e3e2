//! Protocol identifier newtypes.
//!
//! Room and user identifiers follow the messaging service's sigil grammar
//! (`!opaque:server` for rooms, `@localpart:server` for users). They are
//! validated at construction so that downstream components never see a
//! malformed correlation key.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

static ROOM_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^![A-Za-z0-9._=/+\-]+:[A-Za-z0-9][A-Za-z0-9.\-]*(?::\d{1,5})?$")
        .unwrap_or_else(|e| panic!("room id pattern: {e}"))
});

static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@[a-z0-9._=/+\-]+:[A-Za-z0-9][A-Za-z0-9.\-]*(?::\d{1,5})?$")
        .unwrap_or_else(|e| panic!("user id pattern: {e}"))
});

/// A validated room identifier, e.g. `!abc:server.example`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validate and wrap a raw room identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, BridgeError> {
        let raw = raw.into();
        if ROOM_ID_PATTERN.is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(BridgeError::invalid_identifier(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The server-name part after the first colon.
    pub fn server_name(&self) -> &str {
        self.0.split_once(':').map(|(_, s)| s).unwrap_or("")
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A validated user identifier, e.g. `@bob:server.example`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw user identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, BridgeError> {
        let raw = raw.into();
        if USER_ID_PATTERN.is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(BridgeError::invalid_identifier(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The localpart between the sigil and the first colon.
    pub fn localpart(&self) -> &str {
        let without_sigil = &self.0[1..];
        without_sigil
            .split_once(':')
            .map(|(l, _)| l)
            .unwrap_or(without_sigil)
    }

    /// The server-name part after the first colon.
    pub fn server_name(&self) -> &str {
        self.0.split_once(':').map(|(_, s)| s).unwrap_or("")
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_room_ids() {
        assert!(RoomId::new("!abc:server").is_ok());
        assert!(RoomId::new("!aBc123:server.example").is_ok());
        assert!(RoomId::new("!x-y_z:server.example:8448").is_ok());
    }

    #[test]
    fn test_invalid_room_ids() {
        assert!(RoomId::new("abc:server").is_err()); // missing sigil
        assert!(RoomId::new("!abc").is_err()); // missing server
        assert!(RoomId::new("@abc:server").is_err()); // wrong sigil
        assert!(RoomId::new("").is_err());
        assert!(RoomId::new("!ab c:server").is_err()); // whitespace
    }

    #[test]
    fn test_valid_user_ids() {
        assert!(UserId::new("@bob:server").is_ok());
        assert!(UserId::new("@dr.bob_42:server.example:8448").is_ok());
    }

    #[test]
    fn test_invalid_user_ids() {
        assert!(UserId::new("@Bob:server").is_err()); // uppercase localpart
        assert!(UserId::new("bob:server").is_err());
        assert!(UserId::new("@bob").is_err());
        assert!(UserId::new("!bob:server").is_err());
    }

    #[test]
    fn test_room_id_parts() {
        let room = RoomId::new("!abc:server.example:8448").unwrap();
        assert_eq!(room.as_str(), "!abc:server.example:8448");
        assert_eq!(room.server_name(), "server.example:8448");
    }

    #[test]
    fn test_user_id_parts() {
        let user = UserId::new("@bob:server.example").unwrap();
        assert_eq!(user.localpart(), "bob");
        assert_eq!(user.server_name(), "server.example");
    }

    #[test]
    fn test_identifier_display_roundtrip() {
        let room: RoomId = "!abc:server".parse().unwrap();
        assert_eq!(room.to_string(), "!abc:server");

        let user: UserId = "@bob:server".parse().unwrap();
        assert_eq!(user.to_string(), "@bob:server");
    }

    #[test]
    fn test_identifier_serde_transparent() {
        let room = RoomId::new("!abc:server").unwrap();
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"!abc:server\"");

        let back: RoomId = serde_json::from_str("\"!abc:server\"").unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn test_error_carries_offending_value() {
        match RoomId::new("nonsense") {
            Err(BridgeError::InvalidIdentifier(v)) => assert_eq!(v, "nonsense"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
