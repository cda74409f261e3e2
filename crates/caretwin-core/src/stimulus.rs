//! Stimuli: immutable records that something happened to a twin.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::twin::TwinId;
use crate::uow::UowId;

/// Unique identifier of a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimulusId(Uuid);

impl StimulusId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StimulusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable record of "something happened to a twin", produced once
/// per normalized event that maps to a known or creatable twin.
///
/// Built with the `with_*` methods before first use and never mutated
/// afterwards; all fields are read through accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stimulus {
    id: StimulusId,
    twin_id: TwinId,
    uow_id: UowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol_event: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_event: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl Stimulus {
    /// Create a stimulus targeting a twin, originating from a unit of work.
    pub fn for_twin(twin_id: TwinId, uow_id: UowId) -> Self {
        Self {
            id: StimulusId::new(),
            twin_id,
            uow_id,
            protocol_event: None,
            resource_event: None,
            snapshot: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attach the triggering raw protocol event.
    pub fn with_protocol_event(mut self, event: serde_json::Value) -> Self {
        self.protocol_event = Some(event);
        self
    }

    /// Attach the equivalent clinical-resource event.
    pub fn with_resource_event(mut self, event: serde_json::Value) -> Self {
        self.resource_event = Some(event);
        self
    }

    /// Attach a simplified resource snapshot.
    pub fn with_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn id(&self) -> StimulusId {
        self.id
    }

    pub fn twin_id(&self) -> &TwinId {
        &self.twin_id
    }

    pub fn uow_id(&self) -> UowId {
        self.uow_id
    }

    pub fn protocol_event(&self) -> Option<&serde_json::Value> {
        self.protocol_event.as_ref()
    }

    pub fn resource_event(&self) -> Option<&serde_json::Value> {
        self.resource_event.as_ref()
    }

    pub fn snapshot(&self) -> Option<&serde_json::Value> {
        self.snapshot.as_ref()
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twin::TwinType;
    use serde_json::json;

    #[test]
    fn test_stimulus_construction() {
        let twin = TwinId::new(TwinType::Practitioner, "p-1");
        let uow = UowId::new();
        let stimulus = Stimulus::for_twin(twin.clone(), uow)
            .with_protocol_event(json!({"type": "m.room.member"}))
            .with_snapshot(json!({"resourceType": "Practitioner", "id": "p-1"}));

        assert_eq!(stimulus.twin_id(), &twin);
        assert_eq!(stimulus.uow_id(), uow);
        assert!(stimulus.protocol_event().is_some());
        assert!(stimulus.resource_event().is_none());
        assert!(stimulus.snapshot().is_some());
    }

    #[test]
    fn test_stimulus_ids_are_unique() {
        let twin = TwinId::new(TwinType::Group, "g-1");
        let a = Stimulus::for_twin(twin.clone(), UowId::new());
        let b = Stimulus::for_twin(twin, UowId::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_stimulus_serde_roundtrip() {
        let stimulus = Stimulus::for_twin(TwinId::new(TwinType::CareTeam, "ct-9"), UowId::new())
            .with_resource_event(json!({"event": "updated"}));

        let json = serde_json::to_string(&stimulus).unwrap();
        let back: Stimulus = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id(), stimulus.id());
        assert_eq!(back.twin_id(), stimulus.twin_id());
        assert_eq!(back.resource_event(), stimulus.resource_event());
        assert!(back.protocol_event().is_none());
    }
}
