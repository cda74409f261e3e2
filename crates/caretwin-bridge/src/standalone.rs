//! Standalone collaborator implementations for local runs and tests.
//!
//! Production deployments supply live collaborators; these serve seeded
//! or logging stand-ins so the bridge can run end-to-end without any
//! external system.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use caretwin_broker::{
    BrokerError, ClinicalResource, EgressTransport, ResourceBroker, RoomDetail, RoomDirectory,
    TopicRegistry,
};
use caretwin_core::{DataParcelToken, RoomId, UnitOfWork};

/// Room directory serving a fixed seed of room details.
#[derive(Debug, Default)]
pub struct SeedDirectory {
    rooms: HashMap<String, RoomDetail>,
}

impl SeedDirectory {
    pub fn new(details: impl IntoIterator<Item = RoomDetail>) -> Self {
        Self {
            rooms: details
                .into_iter()
                .map(|detail| (detail.room_id.as_str().to_string(), detail))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomDirectory for SeedDirectory {
    async fn room_detail(&self, room: &RoomId) -> Result<RoomDetail, BrokerError> {
        self.rooms
            .get(room.as_str())
            .cloned()
            .ok_or_else(|| BrokerError::not_found(room.as_str()))
    }
}

/// Resource broker serving a fixed seed of clinical resources keyed by
/// actor reference.
#[derive(Debug, Default)]
pub struct SeedBroker {
    resources: HashMap<String, ClinicalResource>,
}

impl SeedBroker {
    pub fn new(entries: impl IntoIterator<Item = (String, ClinicalResource)>) -> Self {
        Self {
            resources: entries.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceBroker for SeedBroker {
    async fn resource(&self, actor_ref: &str) -> Result<Option<ClinicalResource>, BrokerError> {
        Ok(self.resources.get(actor_ref).cloned())
    }
}

/// Egress transport that logs terminal envelopes.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EgressTransport for LogTransport {
    async fn deliver(&self, uow: UnitOfWork) -> Result<(), BrokerError> {
        match uow.outcome() {
            Some(outcome) => info!(
                uow = %uow.id(),
                outcome = %outcome,
                egress = uow.egress().len(),
                failure = uow.failure_description().unwrap_or_default(),
                "Delivered unit of work"
            ),
            None => info!(uow = %uow.id(), "Delivered non-terminal unit of work"),
        }
        Ok(())
    }
}

/// Topic registry that logs the published interest declaration.
#[derive(Debug, Default)]
pub struct LogTopicRegistry;

impl TopicRegistry for LogTopicRegistry {
    fn publish_interest(&self, tokens: &[DataParcelToken]) {
        for token in tokens {
            info!(token = %token, "Declared data parcel interest");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretwin_core::TwinType;
    use serde_json::json;

    #[tokio::test]
    async fn test_seed_directory_serves_and_misses() {
        let room = RoomId::new("!abc:server").unwrap();
        let directory =
            SeedDirectory::new([RoomDetail::new(room.clone()).with_name("Ward 7")]);

        assert_eq!(
            directory.room_detail(&room).await.unwrap().name.as_deref(),
            Some("Ward 7")
        );
        let missing = RoomId::new("!other:server").unwrap();
        assert!(directory.room_detail(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_seed_broker() {
        let broker = SeedBroker::new([(
            "@bob:server".to_string(),
            ClinicalResource::new(TwinType::PractitionerRole, "cardio", json!({})),
        )]);

        assert!(broker.resource("@bob:server").await.unwrap().is_some());
        assert!(broker.resource("@carol:server").await.unwrap().is_none());
    }
}
