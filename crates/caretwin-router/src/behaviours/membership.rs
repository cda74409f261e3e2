//! Room-membership synchronization: keeps a twin's owned room set in step
//! with the membership events observed in its rooms.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use caretwin_core::{
    BehaviourId, Outcome, OutcomeSet, ProtocolEventKind, RawEvent, RoomId, Stimulus,
};

use crate::behaviour::StimulusBehaviour;
use crate::registry::TwinRegistry;

/// Stimuli-based behaviour registered for every twin type.
pub struct RoomMembershipBehaviour {
    registry: Arc<TwinRegistry>,
}

impl RoomMembershipBehaviour {
    pub fn new(registry: Arc<TwinRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl StimulusBehaviour for RoomMembershipBehaviour {
    fn name(&self) -> &str {
        "room-membership"
    }

    async fn handle(&self, stimulus: &Stimulus) -> OutcomeSet {
        let twin_id = stimulus.twin_id().clone();
        let behaviour = BehaviourId::stimuli_based(twin_id.twin_type());
        let mut set = OutcomeSet::new(behaviour, twin_id.clone());

        let Some(event_value) = stimulus.protocol_event() else {
            return set;
        };
        let Ok(event) = RawEvent::from_payload(event_value) else {
            debug!(stimulus = %stimulus.id(), "Stimulus carries an unreadable protocol event");
            return set;
        };
        if event.kind() != ProtocolEventKind::RoomMember {
            return set;
        }
        let Some(room) = event
            .room_id
            .as_deref()
            .and_then(|raw| RoomId::from_str(raw).ok())
        else {
            return set;
        };

        let action = match event.membership() {
            Some("join") | Some("invite") => {
                let joined = self.registry.update(&twin_id, |twin| twin.join_room(room.clone()));
                match joined {
                    Some(true) => "room-joined",
                    _ => return set,
                }
            }
            Some("leave") | Some("ban") => {
                let left = self.registry.update(&twin_id, |twin| twin.leave_room(&room));
                match left {
                    Some(true) => "room-left",
                    _ => return set,
                }
            }
            _ => return set,
        };

        set.push(
            Outcome::new(json!({"action": action, "room": room.as_str()}))
                .with_stimulus(stimulus.id())
                .with_twin(twin_id),
        );
        set
    }
}
