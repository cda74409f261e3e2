//! The stimulus/behaviour orchestration engine.
//!
//! Normalized events become stimuli, stimuli are dispatched to the
//! behaviour pipeline registered for their twin type, and the resulting
//! outcome sets flow through the egress conduit into the outcome cache.
//! Dispatch is an explicit finite table validated exhaustively at
//! startup; per-twin arrival order is preserved by a dedicated worker per
//! twin.

pub mod behaviour;
pub mod behaviours;
pub mod conduit;
pub mod factory;
pub mod registry;
pub mod router;
pub mod timer;

pub use behaviour::{StimulusBehaviour, TimerBehaviour};
pub use behaviours::{HeartbeatBehaviour, RoomMembershipBehaviour};
pub use conduit::{EgressConduit, OutcomeCacheConduit};
pub use factory::StimulusFactory;
pub use registry::TwinRegistry;
pub use router::{TwinRouter, TwinRouterBuilder};
pub use timer::TimerHandle;
