//! Collaborator-facing contracts of the caretwin bridge.
//!
//! The bridge consumes a room directory and a clinical-resource broker and
//! produces terminal units of work toward an egress transport. All four
//! collaborators are owned by other systems; this crate specifies only the
//! interface boundary, the wire types crossing it, and the error type
//! collaborator implementations report through.

pub mod error;
pub mod traits;
pub mod types;

pub use error::BrokerError;
pub use traits::{EgressTransport, ResourceBroker, RoomDirectory, TopicRegistry};
pub use types::{ClinicalResource, RoomDetail};
