//! Liveness heartbeat: a timer-based behaviour emitting one outcome per
//! active twin of its type on every run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use time::OffsetDateTime;

use caretwin_core::{BehaviourId, Outcome, OutcomeSet, TwinType};

use crate::behaviour::TimerBehaviour;
use crate::registry::TwinRegistry;

pub struct HeartbeatBehaviour {
    twin_type: TwinType,
    registry: Arc<TwinRegistry>,
}

impl HeartbeatBehaviour {
    pub fn new(twin_type: TwinType, registry: Arc<TwinRegistry>) -> Self {
        Self {
            twin_type,
            registry,
        }
    }
}

#[async_trait]
impl TimerBehaviour for HeartbeatBehaviour {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn tick(&self) -> OutcomeSet {
        let behaviour = BehaviourId::timer_based(self.twin_type);
        let mut set = OutcomeSet::for_behaviour(behaviour);
        let at = OffsetDateTime::now_utc().unix_timestamp();

        for twin_id in self.registry.active_of_type(self.twin_type) {
            let rooms = self
                .registry
                .get(&twin_id)
                .map(|twin| twin.rooms().len())
                .unwrap_or_default();
            set.push(
                Outcome::new(json!({"kind": "heartbeat", "at": at, "rooms": rooms}))
                    .with_twin(twin_id),
            );
        }
        set
    }
}
