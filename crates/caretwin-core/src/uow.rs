//! The Unit of Work envelope carried through the normalization pipeline.
//!
//! A UoW is created at ingress, mutated exactly once per normalization
//! stage (token rewritten to NORMALIZED, egress payload appended) and
//! consumed once routed. The outcome invariants live in this module's API:
//! `Failed` always carries a description, and `Success` is unreachable
//! while the egress set is empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::parcel::DataParcelToken;

/// Unique identifier of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UowId(Uuid);

impl UowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque content plus the token classifying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub token: DataParcelToken,
    pub content: serde_json::Value,
}

impl Payload {
    pub fn new(token: DataParcelToken, content: serde_json::Value) -> Self {
        Self { token, content }
    }
}

/// Terminal processing outcome of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingOutcome {
    Success,
    Failed,
    NoProcessingRequired,
}

impl ProcessingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingOutcome::Success => "SUCCESS",
            ProcessingOutcome::Failed => "FAILED",
            ProcessingOutcome::NoProcessingRequired => "NO_PROCESSING_REQUIRED",
        }
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The envelope moving a payload through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOfWork {
    id: UowId,
    ingress: Payload,
    egress: Vec<Payload>,
    outcome: Option<ProcessingOutcome>,
    failure: Option<String>,
}

impl UnitOfWork {
    /// Create a fresh envelope around an ingress payload. The outcome is
    /// unset until a normalization stage decides it.
    pub fn new(ingress: Payload) -> Self {
        Self {
            id: UowId::new(),
            ingress,
            egress: Vec::new(),
            outcome: None,
            failure: None,
        }
    }

    pub fn id(&self) -> UowId {
        self.id
    }

    pub fn ingress(&self) -> &Payload {
        &self.ingress
    }

    pub fn egress(&self) -> &[Payload] {
        &self.egress
    }

    /// The terminal outcome, if a stage has set one.
    pub fn outcome(&self) -> Option<ProcessingOutcome> {
        self.outcome
    }

    pub fn failure_description(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Some(ProcessingOutcome::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(ProcessingOutcome::Success)
    }

    /// Append an egress payload produced by a normalization stage.
    pub fn push_egress(&mut self, payload: Payload) {
        self.egress.push(payload);
    }

    /// Mark the envelope failed. The only path to `Failed`, so the
    /// "failed iff described" invariant holds by construction.
    pub fn fail(&mut self, description: impl Into<String>) {
        self.outcome = Some(ProcessingOutcome::Failed);
        self.failure = Some(description.into());
    }

    /// Mark the envelope failed from a pipeline error, keeping the error's
    /// display form as the description.
    pub fn fail_with(&mut self, error: &BridgeError) {
        self.fail(error.to_string());
    }

    /// Mark the envelope successful.
    ///
    /// Refused while the egress set is empty: a successful stage must have
    /// produced at least one normalized payload.
    pub fn mark_success(&mut self) -> Result<()> {
        if self.egress.is_empty() {
            return Err(BridgeError::invalid_envelope(
                "cannot mark success with an empty egress payload set",
            ));
        }
        self.outcome = Some(ProcessingOutcome::Success);
        self.failure = None;
        Ok(())
    }

    /// Mark the envelope as needing no processing. Explicitly distinct
    /// from success: nothing to enrich, not an error.
    pub fn mark_no_processing_required(&mut self) {
        self.outcome = Some(ProcessingOutcome::NoProcessingRequired);
        self.failure = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::{DataParcelToken, DataSubcategory};
    use serde_json::json;

    fn ingress_payload() -> Payload {
        Payload::new(
            DataParcelToken::new(DataSubcategory::RoomEvents, "m.room.create", None),
            json!({"type": "m.room.create", "room_id": "!abc:server"}),
        )
    }

    #[test]
    fn test_new_uow_is_not_terminal() {
        let uow = UnitOfWork::new(ingress_payload());
        assert!(uow.outcome().is_none());
        assert!(!uow.is_terminal());
        assert!(uow.egress().is_empty());
        assert!(uow.failure_description().is_none());
    }

    #[test]
    fn test_fail_sets_outcome_and_description_together() {
        let mut uow = UnitOfWork::new(ingress_payload());
        uow.fail("event has no room_id");

        assert!(uow.is_failed());
        assert_eq!(uow.failure_description(), Some("event has no room_id"));
    }

    #[test]
    fn test_fail_with_error_display() {
        let mut uow = UnitOfWork::new(ingress_payload());
        uow.fail_with(&BridgeError::directory_lookup("homeserver unreachable"));

        assert!(uow.is_failed());
        assert_eq!(
            uow.failure_description(),
            Some("Room directory lookup failed: homeserver unreachable")
        );
    }

    #[test]
    fn test_success_requires_egress() {
        let mut uow = UnitOfWork::new(ingress_payload());
        assert!(uow.mark_success().is_err());
        assert!(!uow.is_terminal());

        let normalized = Payload::new(
            uow.ingress().token.clone().into_normalized(),
            uow.ingress().content.clone(),
        );
        uow.push_egress(normalized);
        uow.mark_success().unwrap();

        assert!(uow.is_success());
        assert!(uow.failure_description().is_none());
        assert_eq!(uow.egress().len(), 1);
    }

    #[test]
    fn test_no_processing_required_without_egress() {
        let mut uow = UnitOfWork::new(ingress_payload());
        uow.mark_no_processing_required();

        assert_eq!(uow.outcome(), Some(ProcessingOutcome::NoProcessingRequired));
        assert!(uow.egress().is_empty());
        assert!(uow.failure_description().is_none());
    }

    #[test]
    fn test_success_clears_prior_failure() {
        let mut uow = UnitOfWork::new(ingress_payload());
        uow.fail("transient");
        uow.push_egress(ingress_payload());
        uow.mark_success().unwrap();

        assert!(uow.is_success());
        assert!(uow.failure_description().is_none());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ProcessingOutcome::Success.to_string(), "SUCCESS");
        assert_eq!(ProcessingOutcome::Failed.to_string(), "FAILED");
        assert_eq!(
            ProcessingOutcome::NoProcessingRequired.to_string(),
            "NO_PROCESSING_REQUIRED"
        );
    }

    #[test]
    fn test_uow_serde_roundtrip() {
        let mut uow = UnitOfWork::new(ingress_payload());
        uow.push_egress(Payload::new(
            uow.ingress().token.clone().into_normalized(),
            uow.ingress().content.clone(),
        ));
        uow.mark_success().unwrap();

        let json = serde_json::to_string(&uow).unwrap();
        let back: UnitOfWork = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id(), uow.id());
        assert!(back.is_success());
        assert_eq!(back.egress().len(), 1);
        assert!(back.egress()[0].token.is_normalized());
    }
}
