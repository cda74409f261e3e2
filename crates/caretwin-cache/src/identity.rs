//! Identity mapping service: the authority for "is this room/user already
//! known" classification decisions used by the event normalizers.
//!
//! Three independent TTL caches: room-id to display name, room-id to the
//! clinical resource the room belongs to, and user-id to twin. A single
//! key maps to at most one value at a time (last-writer-wins).

use std::time::Duration;

use tracing::debug;

use caretwin_core::{RoomId, TwinId, TwinType, UserId};

use crate::ttl::{CacheStats, TtlCache};

/// Bidirectional, TTL-bearing identity lookups shared by all normalizers.
#[derive(Debug)]
pub struct IdentityMappings {
    room_names: TtlCache<String>,
    room_resources: TtlCache<TwinId>,
    user_twins: TtlCache<TwinId>,
}

impl IdentityMappings {
    /// Create the service with one TTL applied to all three mappings.
    pub fn new(ttl: Duration) -> Self {
        Self {
            room_names: TtlCache::new(ttl),
            room_resources: TtlCache::new(ttl),
            user_twins: TtlCache::new(ttl),
        }
    }

    // ==================== Room name mapping ====================

    pub fn map_room_name(&self, room: &RoomId, name: impl Into<String>) {
        self.room_names.put(room.as_str(), name.into());
    }

    pub fn room_name(&self, room: &RoomId) -> Option<String> {
        self.room_names.get(room.as_str())
    }

    pub fn has_room_name(&self, room: &RoomId) -> bool {
        self.room_names.contains_key(room.as_str())
    }

    pub fn remove_room_name(&self, room: &RoomId) -> Option<String> {
        self.room_names.remove(room.as_str())
    }

    // ==================== Room resource mapping ====================

    pub fn map_room_to_resource(&self, room: &RoomId, resource: TwinId) {
        debug!(room = %room, resource = %resource, "Mapped room to clinical resource");
        self.room_resources.put(room.as_str(), resource);
    }

    pub fn room_resource(&self, room: &RoomId) -> Option<TwinId> {
        self.room_resources.get(room.as_str())
    }

    pub fn is_practitioner_role_room(&self, room: &RoomId) -> bool {
        self.room_resource(room)
            .is_some_and(|twin| twin.twin_type() == TwinType::PractitionerRole)
    }

    pub fn is_healthcare_service_room(&self, room: &RoomId) -> bool {
        self.room_resource(room)
            .is_some_and(|twin| twin.twin_type() == TwinType::HealthcareService)
    }

    /// A room is classified once it is a role room, a service room, or has
    /// an assigned name.
    pub fn is_room_classified(&self, room: &RoomId) -> bool {
        self.is_practitioner_role_room(room)
            || self.is_healthcare_service_room(room)
            || self.has_room_name(room)
    }

    pub fn remove_room_resource(&self, room: &RoomId) -> Option<TwinId> {
        self.room_resources.remove(room.as_str())
    }

    // ==================== User twin mapping ====================

    pub fn map_user_to_twin(&self, user: &UserId, twin: TwinId) {
        debug!(user = %user, twin = %twin, "Mapped user to twin");
        self.user_twins.put(user.as_str(), twin);
    }

    pub fn map_user_to_practitioner_role(&self, user: &UserId, twin: TwinId) {
        debug_assert_eq!(twin.twin_type(), TwinType::PractitionerRole);
        self.map_user_to_twin(user, twin);
    }

    pub fn user_twin(&self, user: &UserId) -> Option<TwinId> {
        self.user_twins.get(user.as_str())
    }

    pub fn is_practitioner_role_user(&self, user: &UserId) -> bool {
        self.user_twin(user)
            .is_some_and(|twin| twin.twin_type() == TwinType::PractitionerRole)
    }

    pub fn is_healthcare_service_user(&self, user: &UserId) -> bool {
        self.user_twin(user)
            .is_some_and(|twin| twin.twin_type() == TwinType::HealthcareService)
    }

    /// A user is a known clinical actor when any twin mapping exists.
    pub fn is_known_clinical_user(&self, user: &UserId) -> bool {
        self.user_twins.contains_key(user.as_str())
    }

    pub fn remove_user_mapping(&self, user: &UserId) -> Option<TwinId> {
        self.user_twins.remove(user.as_str())
    }

    /// Reverse removal: drop every user mapping that points at the given
    /// practitioner-role twin. Removes all matches, not just the first,
    /// so a re-mapped user cannot leave stale duplicates behind.
    pub fn remove_mapping_for_practitioner_role(&self, twin: &TwinId) -> usize {
        let users = self.user_twins.keys_matching(|mapped| mapped == twin);
        let removed = users.len();
        for user in users {
            self.user_twins.remove(&user);
        }
        if removed > 0 {
            debug!(twin = %twin, removed, "Removed user mappings for retired practitioner role");
        }
        removed
    }

    /// Per-mapping statistics in declaration order: names, resources,
    /// user twins.
    pub fn stats(&self) -> [CacheStats; 3] {
        [
            self.room_names.stats(),
            self.room_resources.stats(),
            self.user_twins.stats(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> IdentityMappings {
        IdentityMappings::new(Duration::from_secs(60))
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_room_name_mapping() {
        let mappings = mappings();
        let r = room("!abc:server");

        assert!(!mappings.has_room_name(&r));
        mappings.map_room_name(&r, "Cardiology on-call");
        assert!(mappings.has_room_name(&r));
        assert_eq!(
            mappings.room_name(&r),
            Some("Cardiology on-call".to_string())
        );
    }

    #[test]
    fn test_room_classification_predicates() {
        let mappings = mappings();
        let role_room = room("!role:server");
        let service_room = room("!service:server");
        let named_room = room("!named:server");
        let unknown_room = room("!unknown:server");

        mappings.map_room_to_resource(
            &role_room,
            TwinId::new(TwinType::PractitionerRole, "cardio"),
        );
        mappings.map_room_to_resource(
            &service_room,
            TwinId::new(TwinType::HealthcareService, "radiology"),
        );
        mappings.map_room_name(&named_room, "Ward 7");

        assert!(mappings.is_practitioner_role_room(&role_room));
        assert!(!mappings.is_healthcare_service_room(&role_room));
        assert!(mappings.is_healthcare_service_room(&service_room));

        assert!(mappings.is_room_classified(&role_room));
        assert!(mappings.is_room_classified(&service_room));
        assert!(mappings.is_room_classified(&named_room));
        assert!(!mappings.is_room_classified(&unknown_room));
    }

    #[test]
    fn test_classification_is_stable_without_intervening_mutation() {
        let mappings = mappings();
        let r = room("!role:server");
        mappings.map_room_to_resource(&r, TwinId::new(TwinType::PractitionerRole, "cardio"));

        // Two reads with no mutation in between must agree.
        assert_eq!(
            mappings.is_practitioner_role_room(&r),
            mappings.is_practitioner_role_room(&r)
        );
    }

    #[test]
    fn test_user_twin_mapping_predicates() {
        let mappings = mappings();
        let bob = user("@bob:server");
        let radiology_bot = user("@radiology:server");
        let stranger = user("@carol:server");

        mappings
            .map_user_to_practitioner_role(&bob, TwinId::new(TwinType::PractitionerRole, "r-1"));
        mappings.map_user_to_twin(
            &radiology_bot,
            TwinId::new(TwinType::HealthcareService, "radiology"),
        );

        assert!(mappings.is_practitioner_role_user(&bob));
        assert!(!mappings.is_healthcare_service_user(&bob));
        assert!(mappings.is_healthcare_service_user(&radiology_bot));
        assert!(mappings.is_known_clinical_user(&bob));
        assert!(!mappings.is_known_clinical_user(&stranger));
    }

    #[test]
    fn test_reverse_removal_removes_all_matches() {
        let mappings = mappings();
        let twin = TwinId::new(TwinType::PractitionerRole, "on-call");
        let other = TwinId::new(TwinType::PractitionerRole, "ward");

        mappings.map_user_to_practitioner_role(&user("@a:server"), twin.clone());
        mappings.map_user_to_practitioner_role(&user("@b:server"), twin.clone());
        mappings.map_user_to_practitioner_role(&user("@c:server"), other.clone());

        assert_eq!(mappings.remove_mapping_for_practitioner_role(&twin), 2);
        assert!(!mappings.is_practitioner_role_user(&user("@a:server")));
        assert!(!mappings.is_practitioner_role_user(&user("@b:server")));
        assert!(mappings.is_practitioner_role_user(&user("@c:server")));

        assert_eq!(mappings.remove_mapping_for_practitioner_role(&twin), 0);
    }

    #[test]
    fn test_mappings_are_independent() {
        let mappings = mappings();
        let r = room("!abc:server");

        mappings.map_room_name(&r, "Ward 7");
        assert!(mappings.room_resource(&r).is_none());

        mappings.remove_room_name(&r);
        assert!(!mappings.has_room_name(&r));
    }
}
