//! Outcomes: the results of behaviour executions, attributable to a
//! source behaviour and (optionally) a source stimulus.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stimulus::StimulusId;
use crate::twin::{TwinId, TwinType};

/// The two behaviour archetypes the router dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviourArchetype {
    StimuliBased,
    TimerBased,
}

impl BehaviourArchetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviourArchetype::StimuliBased => "stimuli-based",
            BehaviourArchetype::TimerBased => "timer-based",
        }
    }
}

impl fmt::Display for BehaviourArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a behaviour: the (twin type, archetype) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviourId {
    pub twin_type: TwinType,
    pub archetype: BehaviourArchetype,
}

impl BehaviourId {
    pub fn new(twin_type: TwinType, archetype: BehaviourArchetype) -> Self {
        Self {
            twin_type,
            archetype,
        }
    }

    pub fn stimuli_based(twin_type: TwinType) -> Self {
        Self::new(twin_type, BehaviourArchetype::StimuliBased)
    }

    pub fn timer_based(twin_type: TwinType) -> Self {
        Self::new(twin_type, BehaviourArchetype::TimerBased)
    }
}

impl fmt::Display for BehaviourId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.twin_type, self.archetype)
    }
}

/// Unique identifier of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeId(Uuid);

impl OutcomeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OutcomeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of one behaviour execution.
///
/// Provenance fields are optional at construction so a behaviour can emit
/// bare outcomes; the outcome cache backfills them from the surrounding
/// [`OutcomeSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    id: OutcomeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    behaviour: Option<BehaviourId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stimulus: Option<StimulusId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    twin: Option<TwinId>,
    content: serde_json::Value,
}

impl Outcome {
    pub fn new(content: serde_json::Value) -> Self {
        Self {
            id: OutcomeId::new(),
            behaviour: None,
            stimulus: None,
            twin: None,
            content,
        }
    }

    pub fn with_behaviour(mut self, behaviour: BehaviourId) -> Self {
        self.behaviour = Some(behaviour);
        self
    }

    pub fn with_stimulus(mut self, stimulus: StimulusId) -> Self {
        self.stimulus = Some(stimulus);
        self
    }

    pub fn with_twin(mut self, twin: TwinId) -> Self {
        self.twin = Some(twin);
        self
    }

    pub fn id(&self) -> OutcomeId {
        self.id
    }

    pub fn behaviour(&self) -> Option<BehaviourId> {
        self.behaviour
    }

    pub fn stimulus(&self) -> Option<StimulusId> {
        self.stimulus
    }

    pub fn twin(&self) -> Option<&TwinId> {
        self.twin.as_ref()
    }

    pub fn content(&self) -> &serde_json::Value {
        &self.content
    }

    /// Fill unset provenance fields from an outcome set's declared source.
    /// Fields already set are left alone.
    pub fn backfill_provenance(&mut self, behaviour: BehaviourId, twin: Option<&TwinId>) {
        if self.behaviour.is_none() {
            self.behaviour = Some(behaviour);
        }
        if self.twin.is_none() {
            self.twin = twin.cloned();
        }
    }
}

/// A batch of outcomes from a single behaviour execution, carrying the
/// provenance used for backfill.
///
/// Stimuli-based sets declare the twin the stimulus targeted; timer-based
/// sets span twins, so their declared twin is absent and each outcome
/// names its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSet {
    source_behaviour: BehaviourId,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_twin: Option<TwinId>,
    outcomes: Vec<Outcome>,
}

impl OutcomeSet {
    pub fn new(source_behaviour: BehaviourId, source_twin: TwinId) -> Self {
        Self {
            source_behaviour,
            source_twin: Some(source_twin),
            outcomes: Vec::new(),
        }
    }

    /// A set with no declared twin, for timer-based behaviours.
    pub fn for_behaviour(source_behaviour: BehaviourId) -> Self {
        Self {
            source_behaviour,
            source_twin: None,
            outcomes: Vec::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcomes.push(outcome);
        self
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn source_behaviour(&self) -> BehaviourId {
        self.source_behaviour
    }

    pub fn source_twin(&self) -> Option<&TwinId> {
        self.source_twin.as_ref()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn into_outcomes(self) -> (BehaviourId, Option<TwinId>, Vec<Outcome>) {
        (self.source_behaviour, self.source_twin, self.outcomes)
    }
}
