//! Behaviour traits.
//!
//! A behaviour is a narrow reactive unit keyed by (twin type, archetype).
//! Behaviours never let a fault cross their boundary: a failed execution
//! returns an empty outcome set.

use async_trait::async_trait;

use caretwin_core::{OutcomeSet, Stimulus};

/// A behaviour consuming stimuli for one twin type.
#[async_trait]
pub trait StimulusBehaviour: Send + Sync {
    fn name(&self) -> &str;

    /// Handle one stimulus, producing zero or more outcomes.
    async fn handle(&self, stimulus: &Stimulus) -> OutcomeSet;
}

/// A behaviour running on a schedule, independent of stimuli.
#[async_trait]
pub trait TimerBehaviour: Send + Sync {
    fn name(&self) -> &str;

    /// One scheduled run, producing zero or more outcomes.
    async fn tick(&self) -> OutcomeSet;
}

// Ensure traits are object-safe by using them as trait objects
#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_stimulus_behaviour_object_safe(_: &dyn StimulusBehaviour) {}
    fn _assert_timer_behaviour_object_safe(_: &dyn TimerBehaviour) {}
}
