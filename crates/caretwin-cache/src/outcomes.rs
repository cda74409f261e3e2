//! The outcome cache: stores behaviour results indexed by source
//! behaviour and source stimulus, with cascading invalidation.
//!
//! Index invariant: every outcome id present in a behaviour index entry
//! corresponds to an outcome still present in the pool, and no empty
//! index sets remain. The invariant is transiently violated inside a single removal call,
//! never observably across calls.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::debug;

use caretwin_core::{BehaviourId, Outcome, OutcomeId, OutcomeSet, StimulusId};

/// Concurrent outcome pool plus behaviour index.
#[derive(Debug, Default)]
pub struct OutcomeCache {
    pool: DashMap<OutcomeId, Outcome>,
    by_behaviour: DashMap<BehaviourId, HashSet<OutcomeId>>,
}

impl OutcomeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an outcome and index it under its source behaviour.
    ///
    /// Re-adding an id is last-writer-wins: the previous entry is removed
    /// (and de-indexed) first.
    pub fn add_outcome(&self, outcome: Outcome) {
        let id = outcome.id();
        if self.pool.contains_key(&id) {
            self.remove_outcome(id);
        }
        let behaviour = outcome.behaviour();
        self.pool.insert(id, outcome);
        if let Some(behaviour) = behaviour {
            self.by_behaviour.entry(behaviour).or_default().insert(id);
        }
    }

    /// Register a whole outcome set, backfilling missing provenance from
    /// the set's declared source behaviour and twin. Single point of
    /// truth for provenance.
    pub fn add_outcome_set(&self, set: OutcomeSet) {
        let (behaviour, twin, outcomes) = set.into_outcomes();
        debug!(behaviour = %behaviour, count = outcomes.len(), "Registering outcome set");
        for mut outcome in outcomes {
            outcome.backfill_provenance(behaviour, twin.as_ref());
            self.add_outcome(outcome);
        }
    }

    /// Remove one outcome from the pool and de-index it. A behaviour
    /// index entry left empty is dropped along with it.
    pub fn remove_outcome(&self, id: OutcomeId) -> Option<Outcome> {
        let (_, outcome) = self.pool.remove(&id)?;
        if let Some(behaviour) = outcome.behaviour() {
            if let Some(mut ids) = self.by_behaviour.get_mut(&behaviour) {
                ids.remove(&id);
                let emptied = ids.is_empty();
                drop(ids);
                if emptied {
                    // Guarded: a concurrent add may have refilled the set.
                    self.by_behaviour.remove_if(&behaviour, |_, ids| ids.is_empty());
                }
            }
        }
        Some(outcome)
    }

    /// Cascading cleanup when a stimulus is retired: remove every outcome
    /// derived from it. Last-writer-wins: an outcome added concurrently
    /// with the retirement may be missed.
    pub fn remove_outcomes_derived_from_stimulus(&self, stimulus: StimulusId) -> usize {
        let derived: Vec<OutcomeId> = self
            .pool
            .iter()
            .filter(|entry| entry.value().stimulus() == Some(stimulus))
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in derived {
            if self.remove_outcome(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(stimulus = %stimulus, removed, "Cascaded outcome removal for retired stimulus");
        }
        removed
    }

    /// Outcomes produced by a behaviour. Empty, never null.
    pub fn behaviour_based_outcomes(&self, behaviour: BehaviourId) -> Vec<Outcome> {
        let Some(ids) = self.by_behaviour.get(&behaviour) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.pool.get(id).map(|entry| entry.value().clone()))
            .collect()
    }

    /// Outcomes derived from a stimulus. Empty, never null.
    pub fn stimulus_derived_outcomes(&self, stimulus: StimulusId) -> Vec<Outcome> {
        self.pool
            .iter()
            .filter(|entry| entry.value().stimulus() == Some(stimulus))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get(&self, id: OutcomeId) -> Option<Outcome> {
        self.pool.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
