//! Converts terminal-success units of work into stimuli, resolving the
//! target twin through the identity mappings and, on a miss, the
//! clinical-resource broker.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use caretwin_broker::ResourceBroker;
use caretwin_cache::IdentityMappings;
use caretwin_core::{
    BridgeError, RawEvent, Result, RoomId, Stimulus, TwinId, UnitOfWork, UserId,
};

/// Builds stimuli from normalized envelopes.
pub struct StimulusFactory {
    mappings: Arc<IdentityMappings>,
    broker: Arc<dyn ResourceBroker>,
    broker_budget: Duration,
}

impl StimulusFactory {
    pub fn new(
        mappings: Arc<IdentityMappings>,
        broker: Arc<dyn ResourceBroker>,
        broker_budget: Duration,
    ) -> Self {
        Self {
            mappings,
            broker,
            broker_budget,
        }
    }

    /// Produce the stimulus for a routed envelope, or `None` when the
    /// envelope maps to no known or creatable twin.
    ///
    /// # Errors
    ///
    /// Broker unavailability and exceeded budgets surface as retryable
    /// errors; the caller decides what to do with the envelope.
    pub async fn stimulus_for(&self, uow: &UnitOfWork) -> Result<Option<Stimulus>> {
        if !uow.is_success() {
            return Ok(None);
        }
        let Some(payload) = uow.egress().first() else {
            return Ok(None);
        };
        let event = RawEvent::from_payload(&payload.content)?;

        let mut snapshot = None;
        let twin_id = match self.resolve_twin(&event, &mut snapshot).await? {
            Some(twin_id) => twin_id,
            None => {
                debug!(uow = %uow.id(), "Normalized event maps to no twin");
                return Ok(None);
            }
        };

        let mut stimulus =
            Stimulus::for_twin(twin_id, uow.id()).with_protocol_event(payload.content.clone());
        if let Some(snapshot) = snapshot {
            stimulus = stimulus.with_snapshot(snapshot);
        }
        Ok(Some(stimulus))
    }

    /// Twin resolution order: the room's mapped resource first, then the
    /// sender's twin mapping, then the resource broker.
    async fn resolve_twin(
        &self,
        event: &RawEvent,
        snapshot: &mut Option<serde_json::Value>,
    ) -> Result<Option<TwinId>> {
        if let Some(raw_room) = event.room_id.as_deref() {
            if let Ok(room) = RoomId::new(raw_room) {
                if let Some(twin) = self.mappings.room_resource(&room) {
                    return Ok(Some(twin));
                }
            }
        }

        let Some(raw_sender) = event.sender.as_deref() else {
            return Ok(None);
        };
        let Ok(sender) = UserId::from_str(raw_sender) else {
            return Ok(None);
        };

        if let Some(twin) = self.mappings.user_twin(&sender) {
            return Ok(Some(twin));
        }

        let lookup = self.broker.resource(sender.as_str());
        let resolved = match tokio::time::timeout(self.broker_budget, lookup).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(error)) => {
                return Err(BridgeError::directory_lookup(format!(
                    "resource broker: {error}"
                )));
            }
            Err(_) => {
                return Err(BridgeError::timeout(
                    "resource broker lookup",
                    self.broker_budget.as_millis() as u64,
                ));
            }
        };

        match resolved {
            Some(resource) => {
                let twin: TwinId = resource.reference.parse()?;
                self.mappings.map_user_to_twin(&sender, twin.clone());
                *snapshot = Some(resource.payload);
                Ok(Some(twin))
            }
            None => Ok(None),
        }
    }
}
