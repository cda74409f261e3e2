//! caretwin bridges a room-based chat protocol with a clinical-resource
//! domain model, keeping digital twins of clinical actors synchronized
//! with the events observed on the chat side.
//!
//! This crate assembles the pipeline, router, and cache services into one
//! `Bridge` and provides the binary entry point. All shared state is
//! constructed here once and passed by reference; there is no ambient
//! global.

pub mod observability;
pub mod standalone;

use std::sync::Arc;

use tracing::{info, warn};

use caretwin_broker::{EgressTransport, ResourceBroker, RoomDirectory, TopicRegistry};
use caretwin_cache::{IdentityMappings, OutcomeCache};
use caretwin_config::BridgeConfig;
use caretwin_core::{
    BridgeError, Result, StimulusId, TwinId, TwinType, UnitOfWork,
};
use caretwin_pipeline::{NormalizationPipeline, RoomEventNormalizer, UserEventNormalizer};
use caretwin_router::{
    HeartbeatBehaviour, OutcomeCacheConduit, RoomMembershipBehaviour, StimulusFactory,
    TimerHandle, TwinRegistry, TwinRouter,
};

/// The assembled bridge.
pub struct Bridge {
    pipeline: NormalizationPipeline,
    factory: StimulusFactory,
    router: TwinRouter,
    mappings: Arc<IdentityMappings>,
    outcomes: Arc<OutcomeCache>,
    transport: Arc<dyn EgressTransport>,
    timers: Vec<TimerHandle>,
}

impl Bridge {
    pub fn builder(config: BridgeConfig) -> BridgeBuilder {
        BridgeBuilder::new(config)
    }

    /// The accepting function for the inbound transport: classify,
    /// normalize, route, and deliver the terminal envelope outward.
    pub async fn ingest(&self, raw: &[u8]) -> UnitOfWork {
        let mut uow = self.pipeline.ingest(raw).await;

        if uow.is_success() {
            match self.factory.stimulus_for(&uow).await {
                Ok(Some(stimulus)) => {
                    if let Err(error) = self.router.route(stimulus) {
                        warn!(uow = %uow.id(), error = %error, "Stimulus routing failed");
                        uow.fail_with(&error);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(uow = %uow.id(), error = %error, "Twin resolution failed");
                    uow.fail_with(&error);
                }
            }
        }

        if let Err(error) = self.transport.deliver(uow.clone()).await {
            warn!(uow = %uow.id(), error = %error, "Egress delivery failed");
        }
        uow
    }

    /// Retire a stimulus, cascading removal of every outcome derived from
    /// it. Returns the number of outcomes removed.
    pub fn retire_stimulus(&self, stimulus: StimulusId) -> usize {
        self.outcomes.remove_outcomes_derived_from_stimulus(stimulus)
    }

    /// Retire a twin. Practitioner-role twins also drop their user
    /// mappings so stale identities cannot classify future events.
    pub fn retire_twin(&self, twin: &TwinId) -> Result<()> {
        self.router.registry().retire(twin)?;
        if twin.twin_type() == TwinType::PractitionerRole {
            self.mappings.remove_mapping_for_practitioner_role(twin);
        }
        Ok(())
    }

    pub fn suspend_twin(&self, twin: &TwinId) -> Result<()> {
        self.router.registry().suspend(twin)
    }

    pub fn mappings(&self) -> &Arc<IdentityMappings> {
        &self.mappings
    }

    pub fn outcomes(&self) -> &Arc<OutcomeCache> {
        &self.outcomes
    }

    pub fn registry(&self) -> &Arc<TwinRegistry> {
        self.router.registry()
    }

    pub fn router(&self) -> &TwinRouter {
        &self.router
    }

    /// Stop the timer triggers. Per-twin workers drain naturally when the
    /// bridge is dropped.
    pub fn shutdown(&self) {
        for timer in &self.timers {
            timer.stop();
        }
        info!("Bridge shut down");
    }
}

/// Builder wiring collaborators and configuration into a `Bridge`.
pub struct BridgeBuilder {
    config: BridgeConfig,
    directory: Option<Arc<dyn RoomDirectory>>,
    broker: Option<Arc<dyn ResourceBroker>>,
    transport: Option<Arc<dyn EgressTransport>>,
    topic_registry: Option<Arc<dyn TopicRegistry>>,
}

impl BridgeBuilder {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            directory: None,
            broker: None,
            transport: None,
            topic_registry: None,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn RoomDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_resource_broker(mut self, broker: Arc<dyn ResourceBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn EgressTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_topic_registry(mut self, registry: Arc<dyn TopicRegistry>) -> Self {
        self.topic_registry = Some(registry);
        self
    }

    /// Construct the bridge: caches, normalizers, the validated router,
    /// and the timer triggers; publish the interest declaration.
    ///
    /// # Errors
    ///
    /// Missing collaborators and dispatch-table gaps are configuration
    /// errors and abort construction.
    pub fn build(self) -> Result<Bridge> {
        let directory = self
            .directory
            .ok_or_else(|| BridgeError::routing_configuration("no room directory configured"))?;
        let broker = self
            .broker
            .ok_or_else(|| BridgeError::routing_configuration("no resource broker configured"))?;
        let transport = self
            .transport
            .ok_or_else(|| BridgeError::routing_configuration("no egress transport configured"))?;

        let mappings = Arc::new(IdentityMappings::new(self.config.identity_ttl()));
        let outcomes = Arc::new(OutcomeCache::new());
        let registry = Arc::new(TwinRegistry::new());

        let pipeline = NormalizationPipeline::new(vec![
            Arc::new(RoomEventNormalizer::new(
                mappings.clone(),
                directory,
                self.config.directory_budget(),
            )),
            Arc::new(UserEventNormalizer::new(mappings.clone())),
        ]);

        let conduit = Arc::new(OutcomeCacheConduit::new(outcomes.clone()));
        let mut router_builder = TwinRouter::builder()
            .with_behaviour_budget(self.config.behaviour_budget());
        for twin_type in TwinType::ALL {
            router_builder = router_builder
                .register_stimuli(twin_type, Arc::new(RoomMembershipBehaviour::new(registry.clone())));
        }
        let router = router_builder.build(registry.clone(), conduit)?;

        let factory = StimulusFactory::new(
            mappings.clone(),
            broker,
            self.config.broker_budget(),
        );

        let mut timers = Vec::new();
        if self.config.timers.enabled {
            for twin_type in TwinType::ALL {
                timers.push(router.install_timer(
                    Arc::new(HeartbeatBehaviour::new(twin_type, registry.clone())),
                    self.config.heartbeat_period(),
                ));
            }
        }

        if let Some(topic_registry) = self.topic_registry {
            pipeline.publish_interest(topic_registry.as_ref());
        }

        info!(timers = timers.len(), "Bridge assembled");
        Ok(Bridge {
            pipeline,
            factory,
            router,
            mappings,
            outcomes,
            transport,
            timers,
        })
    }
}
