//! The twin router: a finite dispatch table from twin type to behaviour
//! pipeline, with per-twin ordered workers.
//!
//! Exactly one stimuli pipeline is active per twin type at a time;
//! re-registering a type atomically replaces the prior pipeline. The
//! table is validated exhaustively at startup; a missing combination
//! aborts installation instead of silently dropping events. Within one
//! twin's stimulus stream arrival order is preserved; across twins,
//! processing runs in parallel.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use caretwin_core::{BridgeError, Result, Stimulus, TwinId, TwinType};

use crate::behaviour::{StimulusBehaviour, TimerBehaviour};
use crate::conduit::EgressConduit;
use crate::registry::TwinRegistry;
use crate::timer::{self, TimerHandle};

/// Default budget for a single behaviour invocation.
const DEFAULT_BEHAVIOUR_BUDGET: Duration = Duration::from_secs(30);

type BehaviourSlot = ArcSwap<Arc<dyn StimulusBehaviour>>;

/// Builder for the router. Collects behaviour registrations, then
/// validates the dispatch table exhaustively on `build`.
pub struct TwinRouterBuilder {
    stimuli: HashMap<TwinType, Arc<dyn StimulusBehaviour>>,
    behaviour_budget: Duration,
}

impl TwinRouterBuilder {
    pub fn new() -> Self {
        Self {
            stimuli: HashMap::new(),
            behaviour_budget: DEFAULT_BEHAVIOUR_BUDGET,
        }
    }

    pub fn with_behaviour_budget(mut self, budget: Duration) -> Self {
        self.behaviour_budget = budget;
        self
    }

    /// Register the stimuli pipeline for a twin type. Idempotent:
    /// registering the same type again replaces the prior pipeline.
    pub fn register_stimuli(
        mut self,
        twin_type: TwinType,
        behaviour: Arc<dyn StimulusBehaviour>,
    ) -> Self {
        if self.stimuli.insert(twin_type, behaviour).is_some() {
            debug!(twin_type = %twin_type, "Replaced stimuli pipeline registration");
        }
        self
    }

    /// Validate the dispatch table and assemble the router.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::RoutingConfiguration` when any twin type has
    /// no stimuli pipeline registered.
    pub fn build(
        self,
        registry: Arc<TwinRegistry>,
        conduit: Arc<dyn EgressConduit>,
    ) -> Result<TwinRouter> {
        let missing: Vec<&str> = TwinType::ALL
            .iter()
            .filter(|twin_type| !self.stimuli.contains_key(twin_type))
            .map(|twin_type| twin_type.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(BridgeError::routing_configuration(format!(
                "no stimuli pipeline registered for twin types: {}",
                missing.join(", ")
            )));
        }

        let slots = self
            .stimuli
            .into_iter()
            .map(|(twin_type, behaviour)| {
                (twin_type, Arc::new(BehaviourSlot::from_pointee(behaviour)))
            })
            .collect();

        info!("Twin router dispatch table validated");
        Ok(TwinRouter {
            slots,
            workers: DashMap::new(),
            registry,
            conduit,
            behaviour_budget: self.behaviour_budget,
        })
    }
}

impl Default for TwinRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled router.
pub struct TwinRouter {
    slots: HashMap<TwinType, Arc<BehaviourSlot>>,
    workers: DashMap<TwinId, mpsc::UnboundedSender<Stimulus>>,
    registry: Arc<TwinRegistry>,
    conduit: Arc<dyn EgressConduit>,
    behaviour_budget: Duration,
}

impl TwinRouter {
    pub fn builder() -> TwinRouterBuilder {
        TwinRouterBuilder::new()
    }

    pub fn registry(&self) -> &Arc<TwinRegistry> {
        &self.registry
    }

    /// Replace the active stimuli pipeline for a twin type. Lock-free;
    /// in-flight invocations finish on the behaviour they loaded.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::RoutingConfiguration` for a twin type absent
    /// from the validated table (unreachable with the five fixed kinds).
    pub fn replace_behaviour(
        &self,
        twin_type: TwinType,
        behaviour: Arc<dyn StimulusBehaviour>,
    ) -> Result<()> {
        let slot = self.slot(twin_type)?;
        slot.store(Arc::new(behaviour));
        info!(twin_type = %twin_type, "Stimuli pipeline replaced");
        Ok(())
    }

    /// Dispatch a stimulus to the pipeline for its twin's type.
    ///
    /// Creates the twin on first reference and enqueues onto the twin's
    /// ordered worker; stimuli for the same twin are processed in arrival
    /// order, stimuli for different twins concurrently.
    pub fn route(&self, stimulus: Stimulus) -> Result<()> {
        let twin_id = stimulus.twin_id().clone();
        let slot = self.slot(twin_id.twin_type())?.clone();

        self.registry.ensure(&twin_id);

        let mut stimulus = stimulus;
        for _ in 0..2 {
            let sender = self
                .workers
                .entry(twin_id.clone())
                .or_insert_with(|| self.spawn_worker(&twin_id, slot.clone()))
                .clone();
            match sender.send(stimulus) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    // Worker task ended; drop the stale channel and retry.
                    stimulus = rejected.0;
                    self.workers.remove(&twin_id);
                }
            }
        }
        Err(BridgeError::routing_configuration(format!(
            "worker for twin {twin_id} is not accepting stimuli"
        )))
    }

    /// Install a recurring trigger for a twin type's timer behaviour.
    ///
    /// The trigger never reads stimuli; a firing that would overlap the
    /// previous invocation is skipped, not queued.
    pub fn install_timer(
        &self,
        behaviour: Arc<dyn TimerBehaviour>,
        period: Duration,
    ) -> TimerHandle {
        timer::install(behaviour, period, self.behaviour_budget, self.conduit.clone())
    }

    /// Number of live per-twin workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn slot(&self, twin_type: TwinType) -> Result<&Arc<BehaviourSlot>> {
        self.slots.get(&twin_type).ok_or_else(|| {
            BridgeError::routing_configuration(format!(
                "no stimuli pipeline for twin type {twin_type}"
            ))
        })
    }

    fn spawn_worker(
        &self,
        twin_id: &TwinId,
        slot: Arc<BehaviourSlot>,
    ) -> mpsc::UnboundedSender<Stimulus> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Stimulus>();
        let conduit = self.conduit.clone();
        let budget = self.behaviour_budget;
        let twin = twin_id.clone();

        tokio::spawn(async move {
            debug!(twin = %twin, "Twin worker started");
            while let Some(stimulus) = rx.recv().await {
                let behaviour = slot.load_full();
                let invocation = AssertUnwindSafe(behaviour.handle(&stimulus)).catch_unwind();
                match tokio::time::timeout(budget, invocation).await {
                    Ok(Ok(set)) => {
                        conduit.forward(set).await;
                    }
                    Ok(Err(_panic)) => {
                        error!(
                            twin = %twin,
                            behaviour = behaviour.name(),
                            stimulus = %stimulus.id(),
                            "Behaviour panicked"
                        );
                    }
                    Err(_) => {
                        error!(
                            twin = %twin,
                            behaviour = behaviour.name(),
                            stimulus = %stimulus.id(),
                            budget_ms = budget.as_millis() as u64,
                            "Behaviour invocation exceeded its budget"
                        );
                    }
                }
            }
            debug!(twin = %twin, "Twin worker stopped");
        });
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::StimulusBehaviour;
    use async_trait::async_trait;
    use caretwin_core::{BehaviourId, Outcome, OutcomeSet, UowId};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CollectingConduit {
        sets: Mutex<Vec<OutcomeSet>>,
    }

    impl CollectingConduit {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sets: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.sets.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EgressConduit for CollectingConduit {
        async fn forward(&self, set: OutcomeSet) {
            self.sets.lock().unwrap().push(set);
        }
    }

    /// Records the order stimuli arrive in, via a sequence counter read
    /// out of the stimulus content.
    struct SequenceRecordingBehaviour {
        seen: Mutex<Vec<u64>>,
    }

    impl SequenceRecordingBehaviour {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl StimulusBehaviour for SequenceRecordingBehaviour {
        fn name(&self) -> &str {
            "sequence-recorder"
        }

        async fn handle(&self, stimulus: &Stimulus) -> OutcomeSet {
            let seq = stimulus
                .protocol_event()
                .and_then(|e| e.get("seq"))
                .and_then(|v| v.as_u64())
                .unwrap_or_default();
            // Yield so racing workers interleave if ordering is broken.
            tokio::task::yield_now().await;
            self.seen.lock().unwrap().push(seq);
            OutcomeSet::new(
                BehaviourId::stimuli_based(stimulus.twin_id().twin_type()),
                stimulus.twin_id().clone(),
            )
            .with_outcome(Outcome::new(json!({"seq": seq})).with_stimulus(stimulus.id()))
        }
    }

    struct CountingBehaviour {
        count: AtomicU32,
    }

    #[async_trait]
    impl StimulusBehaviour for CountingBehaviour {
        fn name(&self) -> &str {
            "counting"
        }

        async fn handle(&self, stimulus: &Stimulus) -> OutcomeSet {
            self.count.fetch_add(1, Ordering::SeqCst);
            OutcomeSet::new(
                BehaviourId::stimuli_based(stimulus.twin_id().twin_type()),
                stimulus.twin_id().clone(),
            )
        }
    }

    fn noop_behaviour() -> Arc<dyn StimulusBehaviour> {
        Arc::new(CountingBehaviour {
            count: AtomicU32::new(0),
        })
    }

    fn full_builder() -> TwinRouterBuilder {
        let mut builder = TwinRouter::builder();
        for twin_type in TwinType::ALL {
            builder = builder.register_stimuli(twin_type, noop_behaviour());
        }
        builder
    }

    fn stimulus_for(twin: &TwinId, seq: u64) -> Stimulus {
        Stimulus::for_twin(twin.clone(), UowId::new()).with_protocol_event(json!({"seq": seq}))
    }

    #[test]
    fn test_build_rejects_incomplete_table() {
        let builder = TwinRouter::builder()
            .register_stimuli(TwinType::Practitioner, noop_behaviour())
            .register_stimuli(TwinType::Group, noop_behaviour());

        let error = builder
            .build(Arc::new(TwinRegistry::new()), CollectingConduit::new())
            .err()
            .expect("incomplete table must fail");

        assert!(error.is_configuration());
        let message = error.to_string();
        assert!(message.contains("PractitionerRole"));
        assert!(message.contains("CareTeam"));
        assert!(message.contains("HealthcareService"));
        assert!(!message.contains("Group,"));
    }

    #[tokio::test]
    async fn test_route_creates_twin_and_forwards_outcomes() {
        let registry = Arc::new(TwinRegistry::new());
        let conduit = CollectingConduit::new();
        let router = full_builder().build(registry.clone(), conduit.clone()).unwrap();

        let twin = TwinId::new(TwinType::Practitioner, "p-1");
        router.route(stimulus_for(&twin, 1)).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(registry.contains(&twin));
        assert_eq!(conduit.count(), 1);
        assert_eq!(router.worker_count(), 1);
    }

    #[tokio::test]
    async fn test_per_twin_order_is_preserved() {
        // Scenario: stimuli submitted from multiple tasks must reach the
        // behaviour in per-twin arrival order.
        let recorder = SequenceRecordingBehaviour::new();
        let mut builder = TwinRouter::builder()
            .register_stimuli(TwinType::PractitionerRole, recorder.clone());
        for twin_type in [
            TwinType::Practitioner,
            TwinType::CareTeam,
            TwinType::Group,
            TwinType::HealthcareService,
        ] {
            builder = builder.register_stimuli(twin_type, noop_behaviour());
        }
        let router = Arc::new(
            builder
                .build(Arc::new(TwinRegistry::new()), CollectingConduit::new())
                .unwrap(),
        );

        let twin = TwinId::new(TwinType::PractitionerRole, "on-call");
        // route() establishes arrival order; the submitting tasks differ
        // from the worker processing them.
        for seq in 0..100u64 {
            router.route(stimulus_for(&twin, seq)).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, (0..100).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_twins_process_in_parallel_but_internally_in_order() {
        let recorder = SequenceRecordingBehaviour::new();
        let mut builder =
            TwinRouter::builder().register_stimuli(TwinType::Group, recorder.clone());
        for twin_type in [
            TwinType::Practitioner,
            TwinType::PractitionerRole,
            TwinType::CareTeam,
            TwinType::HealthcareService,
        ] {
            builder = builder.register_stimuli(twin_type, noop_behaviour());
        }
        let router = builder
            .build(Arc::new(TwinRegistry::new()), CollectingConduit::new())
            .unwrap();

        let twin_a = TwinId::new(TwinType::Group, "a");
        let twin_b = TwinId::new(TwinType::Group, "b");
        for seq in 0..20u64 {
            router.route(stimulus_for(&twin_a, seq * 2)).unwrap();
            router.route(stimulus_for(&twin_b, seq * 2 + 1)).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(router.worker_count(), 2);

        // Per-twin subsequences stay ordered even though the interleaving
        // across twins is free.
        let seen = recorder.seen.lock().unwrap().clone();
        let evens: Vec<u64> = seen.iter().copied().filter(|s| s % 2 == 0).collect();
        let odds: Vec<u64> = seen.iter().copied().filter(|s| s % 2 == 1).collect();
        assert_eq!(evens, (0..20).map(|s| s * 2).collect::<Vec<u64>>());
        assert_eq!(odds, (0..20).map(|s| s * 2 + 1).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_replace_behaviour_is_idempotent_swap() {
        let first = Arc::new(CountingBehaviour {
            count: AtomicU32::new(0),
        });
        let second = Arc::new(CountingBehaviour {
            count: AtomicU32::new(0),
        });

        let mut builder = TwinRouter::builder();
        for twin_type in TwinType::ALL {
            builder = builder.register_stimuli(twin_type, noop_behaviour());
        }
        let builder = builder.register_stimuli(TwinType::CareTeam, first.clone());
        let router = builder
            .build(Arc::new(TwinRegistry::new()), CollectingConduit::new())
            .unwrap();

        let twin = TwinId::new(TwinType::CareTeam, "ct-1");
        router.route(stimulus_for(&twin, 1)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(first.count.load(Ordering::SeqCst), 1);

        router
            .replace_behaviour(TwinType::CareTeam, second.clone())
            .unwrap();
        router.route(stimulus_for(&twin, 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(first.count.load(Ordering::SeqCst), 1);
        assert_eq!(second.count.load(Ordering::SeqCst), 1);
    }

    struct PanickingBehaviour;

    #[async_trait]
    impl StimulusBehaviour for PanickingBehaviour {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _stimulus: &Stimulus) -> OutcomeSet {
            panic!("behaviour exploded");
        }
    }

    #[tokio::test]
    async fn test_panicking_behaviour_does_not_kill_worker() {
        let conduit = CollectingConduit::new();
        let mut builder = TwinRouter::builder();
        for twin_type in TwinType::ALL {
            builder = builder.register_stimuli(twin_type, noop_behaviour());
        }
        let builder = builder.register_stimuli(TwinType::Practitioner, Arc::new(PanickingBehaviour));
        let router = builder
            .build(Arc::new(TwinRegistry::new()), conduit.clone())
            .unwrap();

        let twin = TwinId::new(TwinType::Practitioner, "p-1");
        router.route(stimulus_for(&twin, 1)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The panic was isolated; replacing the behaviour revives the flow
        // on the same worker.
        router
            .replace_behaviour(TwinType::Practitioner, noop_behaviour())
            .unwrap();
        router.route(stimulus_for(&twin, 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(conduit.count(), 1);
        assert_eq!(router.worker_count(), 1);
    }
}
