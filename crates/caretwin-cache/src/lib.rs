//! Shared cache services of the caretwin bridge.
//!
//! Both services here are explicit objects constructed once at process
//! start and passed by reference to every component that needs them;
//! TTLs and eviction are parameters of the abstraction, not deployment
//! configuration.

pub mod identity;
pub mod outcomes;
pub mod ttl;

pub use identity::IdentityMappings;
pub use outcomes::OutcomeCache;
pub use ttl::{CacheStats, TtlCache};

/// Default time-to-live for name/identity mappings: 30 days.
pub const DEFAULT_IDENTITY_TTL: std::time::Duration =
    std::time::Duration::from_secs(30 * 24 * 60 * 60);
