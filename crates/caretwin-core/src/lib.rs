pub mod error;
pub mod event;
pub mod ident;
pub mod outcome;
pub mod parcel;
pub mod stimulus;
pub mod twin;
pub mod uow;

pub use error::{BridgeError, ErrorCategory, Result};
pub use event::{ProtocolEventKind, RawEvent};
pub use ident::{RoomId, UserId};
pub use outcome::{BehaviourArchetype, BehaviourId, Outcome, OutcomeId, OutcomeSet};
pub use parcel::{
    DataCategory, DataParcelToken, DataSubcategory, Discriminator, NormalizationState,
    ValidationState,
};
pub use stimulus::{Stimulus, StimulusId};
pub use twin::{Twin, TwinId, TwinLifecycle, TwinType};
pub use uow::{Payload, ProcessingOutcome, UnitOfWork, UowId};
