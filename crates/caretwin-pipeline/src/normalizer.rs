//! Per-event-family normalizers.
//!
//! A normalizer never lets a fault escape its boundary: every failure is
//! converted into a FAILED unit of work with a human-readable
//! description. Side effects are confined to the identity mapping cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use caretwin_broker::{RoomDetail, RoomDirectory};
use caretwin_cache::IdentityMappings;
use caretwin_core::{
    BridgeError, DataParcelToken, DataSubcategory, Payload, RawEvent, RoomId, TwinId, TwinType,
    UnitOfWork, UserId,
};

/// Marker prefix the room-classification rule looks for in a room topic.
const TOPIC_MARKER_PREFIX: &str = "caretwin:";

/// A pipeline stage that enriches units of work for one event family.
#[async_trait]
pub trait Normalizer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this normalizer handles payloads with the given token.
    fn accepts(&self, token: &DataParcelToken) -> bool;

    /// Process the envelope, deciding pass/fail/no-op.
    async fn normalize(&self, uow: UnitOfWork) -> UnitOfWork;
}

/// Classification derived from a room directory detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomClassification {
    PractitionerRole(TwinId),
    HealthcareService(TwinId),
    Named(String),
    Unclassified,
}

/// Derive a room's classification from its directory detail.
///
/// A structured marker `caretwin:<ResourceType>/<id>` in the topic decides
/// role-room vs service-room; a detail with a name but no recognized
/// marker is a generic named room; neither leaves the room unclassified.
pub fn classify_room_detail(detail: &RoomDetail) -> RoomClassification {
    if let Some(topic) = detail.topic.as_deref() {
        for word in topic.split_whitespace() {
            let Some(reference) = word.strip_prefix(TOPIC_MARKER_PREFIX) else {
                continue;
            };
            let Ok(twin) = reference.parse::<TwinId>() else {
                continue;
            };
            match twin.twin_type() {
                TwinType::PractitionerRole => {
                    return RoomClassification::PractitionerRole(twin);
                }
                TwinType::HealthcareService => {
                    return RoomClassification::HealthcareService(twin);
                }
                _ => {}
            }
        }
    }
    match &detail.name {
        Some(name) => RoomClassification::Named(name.clone()),
        None => RoomClassification::Unclassified,
    }
}

/// Copy the ingress payload to an egress payload whose token is marked
/// NORMALIZED, then mark the envelope successful.
fn finish_normalized(uow: &mut UnitOfWork) {
    let normalized = Payload::new(
        uow.ingress().token.clone().into_normalized(),
        uow.ingress().content.clone(),
    );
    uow.push_egress(normalized);
    if let Err(error) = uow.mark_success() {
        uow.fail_with(&error);
    }
}

// ============================================================================
// Room events
// ============================================================================

/// Normalizer for the room-event family.
pub struct RoomEventNormalizer {
    mappings: Arc<IdentityMappings>,
    directory: Arc<dyn RoomDirectory>,
    lookup_budget: Duration,
}

impl RoomEventNormalizer {
    pub fn new(
        mappings: Arc<IdentityMappings>,
        directory: Arc<dyn RoomDirectory>,
        lookup_budget: Duration,
    ) -> Self {
        Self {
            mappings,
            directory,
            lookup_budget,
        }
    }

    fn extract_room(&self, uow: &UnitOfWork) -> Result<RoomId, BridgeError> {
        let event = RawEvent::from_payload(&uow.ingress().content).map_err(|e| {
            BridgeError::correlation_extraction(format!("payload is not a protocol event: {e}"))
        })?;
        let raw_room = event.room_id.ok_or_else(|| {
            BridgeError::correlation_extraction(format!(
                "{} event carries no room id",
                event.event_type
            ))
        })?;
        RoomId::new(raw_room)
            .map_err(|e| BridgeError::correlation_extraction(format!("malformed room id: {e}")))
    }

    /// Fetch the room detail and record its derived classification in the
    /// identity mapping cache.
    async fn enrich_from_directory(&self, room: &RoomId) -> Result<(), BridgeError> {
        let lookup = self.directory.room_detail(room);
        let detail = match tokio::time::timeout(self.lookup_budget, lookup).await {
            Ok(Ok(detail)) => detail,
            Ok(Err(error)) => {
                return Err(BridgeError::directory_lookup(error.to_string()));
            }
            Err(_) => {
                return Err(BridgeError::timeout(
                    "room directory lookup",
                    self.lookup_budget.as_millis() as u64,
                ));
            }
        };

        match classify_room_detail(&detail) {
            RoomClassification::PractitionerRole(twin) | RoomClassification::HealthcareService(twin) => {
                self.mappings.map_room_to_resource(room, twin);
                if let Some(name) = detail.name {
                    self.mappings.map_room_name(room, name);
                }
            }
            RoomClassification::Named(name) => {
                self.mappings.map_room_name(room, name);
            }
            RoomClassification::Unclassified => {
                // Not yet interesting; leave the cache untouched.
                debug!(room = %room, "Directory detail gave no classification");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Normalizer for RoomEventNormalizer {
    fn name(&self) -> &str {
        "room-events"
    }

    fn accepts(&self, token: &DataParcelToken) -> bool {
        token.subcategory() == DataSubcategory::RoomEvents
    }

    async fn normalize(&self, mut uow: UnitOfWork) -> UnitOfWork {
        let room = match self.extract_room(&uow) {
            Ok(room) => room,
            Err(error) => {
                warn!(uow = %uow.id(), error = %error, "Room event rejected");
                uow.fail_with(&error);
                return uow;
            }
        };

        if !self.mappings.is_room_classified(&room) {
            if let Err(error) = self.enrich_from_directory(&room).await {
                warn!(uow = %uow.id(), room = %room, error = %error, "Room enrichment failed");
                uow.fail_with(&error);
                return uow;
            }
        }

        finish_normalized(&mut uow);
        uow
    }
}

// ============================================================================
// Presence / user events
// ============================================================================

/// Normalizer for presence and other user-scoped events.
pub struct UserEventNormalizer {
    mappings: Arc<IdentityMappings>,
}

impl UserEventNormalizer {
    pub fn new(mappings: Arc<IdentityMappings>) -> Self {
        Self { mappings }
    }

    fn extract_sender(&self, uow: &UnitOfWork) -> Result<UserId, BridgeError> {
        let event = RawEvent::from_payload(&uow.ingress().content).map_err(|e| {
            BridgeError::correlation_extraction(format!("payload is not a protocol event: {e}"))
        })?;
        let raw_sender = event.sender.ok_or_else(|| {
            BridgeError::correlation_extraction(format!(
                "{} event carries no sender",
                event.event_type
            ))
        })?;
        UserId::new(raw_sender)
            .map_err(|e| BridgeError::correlation_extraction(format!("malformed sender: {e}")))
    }
}

#[async_trait]
impl Normalizer for UserEventNormalizer {
    fn name(&self) -> &str {
        "user-events"
    }

    fn accepts(&self, token: &DataParcelToken) -> bool {
        matches!(
            token.subcategory(),
            DataSubcategory::Presence | DataSubcategory::UserEvents
        )
    }

    async fn normalize(&self, mut uow: UnitOfWork) -> UnitOfWork {
        let sender = match self.extract_sender(&uow) {
            Ok(sender) => sender,
            Err(error) => {
                warn!(uow = %uow.id(), error = %error, "User event rejected");
                uow.fail_with(&error);
                return uow;
            }
        };

        if self.mappings.is_known_clinical_user(&sender) {
            finish_normalized(&mut uow);
        } else {
            // Nothing to enrich, not an error.
            debug!(uow = %uow.id(), sender = %sender, "Sender is not a clinical actor");
            uow.mark_no_processing_required();
        }
        uow
    }
}
