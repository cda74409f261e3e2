//! Wire types crossing the collaborator boundary.

use caretwin_core::{RoomId, TwinType, UserId};
use serde::{Deserialize, Serialize};

/// Current state of a room as reported by the external room directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetail {
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub aliases: Vec<String>,
}

impl RoomDetail {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            name: None,
            topic: None,
            creator: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_creator(mut self, creator: UserId) -> Self {
        self.creator = Some(creator);
        self
    }
}

/// A simplified clinical resource as handed over by the resource broker.
///
/// The bridge only needs the identifiers and classification metadata; the
/// payload stays opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalResource {
    /// Relative reference, `Type/id`.
    pub reference: String,
    pub resource_type: TwinType,
    pub payload: serde_json::Value,
}

impl ClinicalResource {
    pub fn new(
        resource_type: TwinType,
        local_id: impl AsRef<str>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            reference: format!("{}/{}", resource_type, local_id.as_ref()),
            resource_type,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_detail_builder() {
        let room = RoomId::new("!abc:server").unwrap();
        let detail = RoomDetail::new(room.clone())
            .with_name("Cardiology on-call")
            .with_topic("caretwin:PractitionerRole/cardio-on-call");

        assert_eq!(detail.room_id, room);
        assert_eq!(detail.name.as_deref(), Some("Cardiology on-call"));
        assert!(detail.creator.is_none());
    }

    #[test]
    fn test_clinical_resource_reference_form() {
        let resource = ClinicalResource::new(
            TwinType::HealthcareService,
            "radiology",
            json!({"active": true}),
        );
        assert_eq!(resource.reference, "HealthcareService/radiology");
        assert_eq!(resource.resource_type, TwinType::HealthcareService);
    }

    #[test]
    fn test_room_detail_serde_omits_empty() {
        let detail = RoomDetail::new(RoomId::new("!abc:server").unwrap());
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("name").is_none());
        assert!(json.get("aliases").is_none());
    }
}
