//! Trait contracts the bridge consumes and exposes.
//!
//! Implementations must be thread-safe (`Send + Sync`). The bridge treats
//! every async call here as synchronous-with-timeout; the timeout guard
//! itself lives on the calling side.

use async_trait::async_trait;

use caretwin_core::{DataParcelToken, RoomId, UnitOfWork};

use crate::error::BrokerError;
use crate::types::{ClinicalResource, RoomDetail};

/// The external room directory.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Fetch the current detail of a room.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Unavailable` when the directory cannot be
    /// reached; the caller converts this into a retryable failed unit of
    /// work.
    async fn room_detail(&self, room: &RoomId) -> Result<RoomDetail, BrokerError>;
}

/// The clinical-resource broker.
#[async_trait]
pub trait ResourceBroker: Send + Sync {
    /// Resolve an actor reference to its simplified clinical resource.
    ///
    /// Returns `None` when the actor is unknown to the clinical side; this
    /// is an answer, not an error.
    async fn resource(&self, actor_ref: &str) -> Result<Option<ClinicalResource>, BrokerError>;
}

/// Outbound transport for terminal units of work.
///
/// The transport decides retry/dead-letter policy for failed envelopes;
/// the bridge performs no retries of its own.
#[async_trait]
pub trait EgressTransport: Send + Sync {
    async fn deliver(&self, uow: UnitOfWork) -> Result<(), BrokerError>;
}

/// Registry the bridge declares its data-parcel interests to at startup.
///
/// A static, load-time declaration, not a runtime negotiation.
pub trait TopicRegistry: Send + Sync {
    fn publish_interest(&self, tokens: &[DataParcelToken]);
}
