//! Data Parcel Tokens, the hierarchical classification keys attached to
//! every payload moving through the bridge.
//!
//! A token serves double duty: as a subscription key (what a normalizer or
//! behaviour accepts) and as a payload tag (what a unit of work carries).
//! Tokens are immutable value objects; equality covers every hierarchical
//! segment plus the version, and deliberately ignores the validation and
//! normalization status flags.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The protocol family every token in this bridge is defined by.
pub const DEFINER: &str = "matrix";

/// Token schema version. Bump only on incompatible taxonomy changes.
pub const PARCEL_VERSION: &str = "1.0.0";

/// Top-level category of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataCategory {
    ClientServerApi,
}

impl DataCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::ClientServerApi => "ClientServerAPI",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse event family under the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSubcategory {
    RoomEvents,
    UserEvents,
    Presence,
    General,
}

impl DataSubcategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSubcategory::RoomEvents => "RoomEvents",
            DataSubcategory::UserEvents => "UserEvents",
            DataSubcategory::Presence => "Presence",
            DataSubcategory::General => "General",
        }
    }
}

impl fmt::Display for DataSubcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the payload behind a token has passed schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationState {
    Unvalidated,
    Validated,
}

/// Whether the payload behind a token has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormalizationState {
    Unnormalized,
    Normalized,
}

/// Optional sub-kind refinement, e.g. the content type of a room message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Discriminator {
    pub kind: String,
    pub value: String,
}

impl Discriminator {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

/// Hierarchical classification key for a payload.
///
/// Construction always yields an Unvalidated + Unnormalized token; the
/// normalization flag is flipped by exactly one component, the event
/// normalizer, via [`DataParcelToken::into_normalized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataParcelToken {
    definer: String,
    category: DataCategory,
    subcategory: DataSubcategory,
    resource: String,
    discriminator: Option<Discriminator>,
    version: String,
    validation: ValidationState,
    normalization: NormalizationState,
}

impl DataParcelToken {
    /// Build a token for a protocol event type.
    ///
    /// Pure function of its inputs: the same `(subcategory, resource,
    /// discriminator)` triple yields a byte-identical token across process
    /// restarts, which is what makes subscription matching reliable.
    pub fn new(
        subcategory: DataSubcategory,
        resource: impl Into<String>,
        discriminator: Option<Discriminator>,
    ) -> Self {
        Self {
            definer: DEFINER.to_string(),
            category: DataCategory::ClientServerApi,
            subcategory,
            resource: resource.into(),
            discriminator,
            version: PARCEL_VERSION.to_string(),
            validation: ValidationState::Unvalidated,
            normalization: NormalizationState::Unnormalized,
        }
    }

    pub fn definer(&self) -> &str {
        &self.definer
    }

    pub fn category(&self) -> DataCategory {
        self.category
    }

    pub fn subcategory(&self) -> DataSubcategory {
        self.subcategory
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn validation(&self) -> ValidationState {
        self.validation
    }

    pub fn normalization(&self) -> NormalizationState {
        self.normalization
    }

    pub fn is_normalized(&self) -> bool {
        self.normalization == NormalizationState::Normalized
    }

    /// The full hierarchical path, used for logging and registry display.
    pub fn path(&self) -> String {
        match &self.discriminator {
            Some(d) => format!(
                "{}.{}.{}.{}.{}",
                self.definer, self.category, self.subcategory, self.resource, d
            ),
            None => format!(
                "{}.{}.{}.{}",
                self.definer, self.category, self.subcategory, self.resource
            ),
        }
    }

    /// Copy of this token with normalization flipped to NORMALIZED.
    ///
    /// Reserved for the event normalizers; every other token field is left
    /// intact.
    pub fn into_normalized(mut self) -> Self {
        self.normalization = NormalizationState::Normalized;
        self
    }

    /// Copy of this token with validation flipped to VALIDATED.
    pub fn into_validated(mut self) -> Self {
        self.validation = ValidationState::Validated;
        self
    }
}

// Equality and hashing cover the hierarchical path and version only; the
// status flags are processing state, not identity.
impl PartialEq for DataParcelToken {
    fn eq(&self, other: &Self) -> bool {
        self.definer == other.definer
            && self.category == other.category
            && self.subcategory == other.subcategory
            && self.resource == other.resource
            && self.discriminator == other.discriminator
            && self.version == other.version
    }
}

impl Eq for DataParcelToken {}

impl Hash for DataParcelToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definer.hash(state);
        self.category.hash(state);
        self.subcategory.hash(state);
        self.resource.hash(state);
        self.discriminator.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for DataParcelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
