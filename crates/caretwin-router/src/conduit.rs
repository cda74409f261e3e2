//! The egress conduit: where completed behaviour executions hand their
//! outcome sets over for registration.

use std::sync::Arc;

use async_trait::async_trait;

use caretwin_cache::OutcomeCache;
use caretwin_core::OutcomeSet;

/// Forwarding target for outcome sets produced by behaviours.
#[async_trait]
pub trait EgressConduit: Send + Sync {
    async fn forward(&self, set: OutcomeSet);
}

/// The standard conduit: registers outcome sets with the outcome cache.
pub struct OutcomeCacheConduit {
    cache: Arc<OutcomeCache>,
}

impl OutcomeCacheConduit {
    pub fn new(cache: Arc<OutcomeCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EgressConduit for OutcomeCacheConduit {
    async fn forward(&self, set: OutcomeSet) {
        self.cache.add_outcome_set(set);
    }
}
