//! Stock behaviours shipped with the bridge.

mod heartbeat;
mod membership;

pub use heartbeat::HeartbeatBehaviour;
pub use membership::RoomMembershipBehaviour;
