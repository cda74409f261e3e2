//! The twin registry: live twins keyed by twin identifier.
//!
//! Twins are created on the first stimulus referencing an unknown
//! identifier and retired only through explicit lifecycle transitions.

use dashmap::DashMap;
use tracing::{debug, info};

use caretwin_core::{BridgeError, Result, Twin, TwinId, TwinType};

/// Concurrent registry of live twins.
#[derive(Debug, Default)]
pub struct TwinRegistry {
    twins: DashMap<TwinId, Twin>,
}

impl TwinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the twin if it is unknown. Returns true when a twin was
    /// created.
    pub fn ensure(&self, id: &TwinId) -> bool {
        let mut created = false;
        self.twins.entry(id.clone()).or_insert_with(|| {
            created = true;
            info!(twin = %id, "Creating twin");
            Twin::new(id.clone(), id.to_reference())
        });
        created
    }

    pub fn contains(&self, id: &TwinId) -> bool {
        self.twins.contains_key(id)
    }

    pub fn get(&self, id: &TwinId) -> Option<Twin> {
        self.twins.get(id).map(|twin| twin.clone())
    }

    /// Run a closure against a twin under its shard lock.
    pub fn update<R>(&self, id: &TwinId, f: impl FnOnce(&mut Twin) -> R) -> Option<R> {
        self.twins.get_mut(id).map(|mut twin| f(&mut twin))
    }

    pub fn suspend(&self, id: &TwinId) -> Result<()> {
        self.transition(id, Twin::suspend)
    }

    /// Retire a twin. The twin stays in the registry in its terminal
    /// state; cleanup of derived outcomes happens at the cache layer.
    pub fn retire(&self, id: &TwinId) -> Result<()> {
        self.transition(id, Twin::retire)
    }

    fn transition(&self, id: &TwinId, f: impl FnOnce(&mut Twin) -> Result<()>) -> Result<()> {
        match self.twins.get_mut(id) {
            Some(mut twin) => {
                f(&mut twin)?;
                debug!(twin = %id, lifecycle = ?twin.lifecycle(), "Twin lifecycle transition");
                Ok(())
            }
            None => Err(BridgeError::InvalidTwinReference(id.to_string())),
        }
    }

    /// Identifiers of all active twins of a type.
    pub fn active_of_type(&self, twin_type: TwinType) -> Vec<TwinId> {
        self.twins
            .iter()
            .filter(|entry| entry.twin_type() == twin_type && entry.is_active())
            .map(|entry| entry.id().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.twins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.twins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretwin_core::{RoomId, TwinLifecycle};

    fn role_id(local: &str) -> TwinId {
        TwinId::new(TwinType::PractitionerRole, local)
    }

    #[test]
    fn test_ensure_creates_once() {
        let registry = TwinRegistry::new();
        let id = role_id("cardio");

        assert!(registry.ensure(&id));
        assert!(!registry.ensure(&id));
        assert_eq!(registry.len(), 1);

        let twin = registry.get(&id).unwrap();
        assert!(twin.is_active());
        assert_eq!(twin.resource_ref(), "PractitionerRole/cardio");
    }

    #[test]
    fn test_update_mutates_in_place() {
        let registry = TwinRegistry::new();
        let id = role_id("cardio");
        registry.ensure(&id);

        let room = RoomId::new("!abc:server").unwrap();
        let joined = registry.update(&id, |twin| twin.join_room(room.clone()));
        assert_eq!(joined, Some(true));

        assert!(registry.get(&id).unwrap().rooms().contains(&room));
        assert!(registry.update(&role_id("ghost"), |_| ()).is_none());
    }

    #[test]
    fn test_lifecycle_through_registry() {
        let registry = TwinRegistry::new();
        let id = role_id("cardio");
        registry.ensure(&id);

        registry.suspend(&id).unwrap();
        assert_eq!(
            registry.get(&id).unwrap().lifecycle(),
            TwinLifecycle::Suspended
        );

        registry.retire(&id).unwrap();
        assert_eq!(
            registry.get(&id).unwrap().lifecycle(),
            TwinLifecycle::Retired
        );
        // Retired twins stay registered.
        assert!(registry.contains(&id));
        assert!(registry.retire(&id).is_err());
    }

    #[test]
    fn test_transition_on_unknown_twin() {
        let registry = TwinRegistry::new();
        assert!(registry.retire(&role_id("ghost")).is_err());
    }

    #[test]
    fn test_active_of_type_excludes_retired() {
        let registry = TwinRegistry::new();
        let active = role_id("active");
        let retired = role_id("retired");
        let other = TwinId::new(TwinType::Group, "g-1");

        registry.ensure(&active);
        registry.ensure(&retired);
        registry.ensure(&other);
        registry.retire(&retired).unwrap();

        let roles = registry.active_of_type(TwinType::PractitionerRole);
        assert_eq!(roles, vec![active]);
    }
}
