//! The digital twin model: an in-memory representative of a clinical actor
//! and the set of rooms it participates in.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BridgeError;
use crate::ident::RoomId;

/// The five fixed clinical actor kinds the bridge keeps twins for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TwinType {
    Practitioner,
    PractitionerRole,
    CareTeam,
    Group,
    HealthcareService,
}

impl TwinType {
    /// Every twin kind, for exhaustive dispatch-table validation.
    pub const ALL: [TwinType; 5] = [
        TwinType::Practitioner,
        TwinType::PractitionerRole,
        TwinType::CareTeam,
        TwinType::Group,
        TwinType::HealthcareService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TwinType::Practitioner => "Practitioner",
            TwinType::PractitionerRole => "PractitionerRole",
            TwinType::CareTeam => "CareTeam",
            TwinType::Group => "Group",
            TwinType::HealthcareService => "HealthcareService",
        }
    }
}

impl fmt::Display for TwinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TwinType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Practitioner" => Ok(TwinType::Practitioner),
            "PractitionerRole" => Ok(TwinType::PractitionerRole),
            "CareTeam" => Ok(TwinType::CareTeam),
            "Group" => Ok(TwinType::Group),
            "HealthcareService" => Ok(TwinType::HealthcareService),
            other => Err(BridgeError::InvalidTwinReference(other.to_string())),
        }
    }
}

/// Stable twin identifier in `Type/id` reference form, so the twin type is
/// recoverable from the identifier alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TwinId {
    twin_type: TwinType,
    local_id: String,
}

impl TwinId {
    pub fn new(twin_type: TwinType, local_id: impl Into<String>) -> Self {
        Self {
            twin_type,
            local_id: local_id.into(),
        }
    }

    pub fn twin_type(&self) -> TwinType {
        self.twin_type
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// The relative reference form, `Type/id`.
    pub fn to_reference(&self) -> String {
        format!("{}/{}", self.twin_type, self.local_id)
    }
}

impl fmt::Display for TwinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_reference())
    }
}

impl FromStr for TwinId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, id_part) = s
            .split_once('/')
            .ok_or_else(|| BridgeError::InvalidTwinReference(s.to_string()))?;
        if id_part.is_empty() {
            return Err(BridgeError::InvalidTwinReference(s.to_string()));
        }
        Ok(Self {
            twin_type: type_part.parse()?,
            local_id: id_part.to_string(),
        })
    }
}

impl From<TwinId> for String {
    fn from(id: TwinId) -> Self {
        id.to_reference()
    }
}

impl TryFrom<String> for TwinId {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle state of a twin. Transitions are explicit; twins are never
/// garbage-collected implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TwinLifecycle {
    #[default]
    Active,
    Suspended,
    Retired,
}

/// A live representation of a clinical actor.
///
/// The twin exclusively owns its room-membership set; room objects
/// themselves are shared read-only references into the identity mapping
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Twin {
    id: TwinId,
    resource_ref: String,
    rooms: HashSet<RoomId>,
    lifecycle: TwinLifecycle,
}

impl Twin {
    /// Create an active twin with no room memberships.
    pub fn new(id: TwinId, resource_ref: impl Into<String>) -> Self {
        Self {
            id,
            resource_ref: resource_ref.into(),
            rooms: HashSet::new(),
            lifecycle: TwinLifecycle::Active,
        }
    }

    pub fn id(&self) -> &TwinId {
        &self.id
    }

    pub fn twin_type(&self) -> TwinType {
        self.id.twin_type()
    }

    pub fn resource_ref(&self) -> &str {
        &self.resource_ref
    }

    pub fn rooms(&self) -> &HashSet<RoomId> {
        &self.rooms
    }

    pub fn lifecycle(&self) -> TwinLifecycle {
        self.lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == TwinLifecycle::Active
    }

    /// Record a room membership. Returns false if already present.
    pub fn join_room(&mut self, room: RoomId) -> bool {
        let added = self.rooms.insert(room);
        if added {
            debug!(twin = %self.id, rooms = self.rooms.len(), "Twin joined room");
        }
        added
    }

    /// Drop a room membership. Returns false if the room was unknown.
    pub fn leave_room(&mut self, room: &RoomId) -> bool {
        self.rooms.remove(room)
    }

    /// Suspend an active twin.
    pub fn suspend(&mut self) -> Result<(), BridgeError> {
        match self.lifecycle {
            TwinLifecycle::Active => {
                self.lifecycle = TwinLifecycle::Suspended;
                Ok(())
            }
            from => Err(BridgeError::InvalidTransition {
                from: format!("{from:?}"),
                to: "Suspended".to_string(),
            }),
        }
    }

    /// Retire a twin. Terminal: a retired twin accepts no further
    /// transitions.
    pub fn retire(&mut self) -> Result<(), BridgeError> {
        match self.lifecycle {
            TwinLifecycle::Active | TwinLifecycle::Suspended => {
                self.lifecycle = TwinLifecycle::Retired;
                Ok(())
            }
            TwinLifecycle::Retired => Err(BridgeError::InvalidTransition {
                from: "Retired".to_string(),
                to: "Retired".to_string(),
            }),
        }
    }
}
