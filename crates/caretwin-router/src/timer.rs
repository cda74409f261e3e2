//! Recurring triggers for timer-based behaviours.
//!
//! A trigger fires on a fixed period and runs its behaviour inline: a
//! firing that would overlap the previous invocation is skipped, never
//! queued. Missed firings are counted and logged.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::behaviour::TimerBehaviour;
use crate::conduit::EgressConduit;

/// Handle to an installed timer trigger.
pub struct TimerHandle {
    task: JoinHandle<()>,
    skipped: Arc<AtomicU64>,
}

impl TimerHandle {
    /// Stop the trigger. In-flight invocations are aborted with it.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Number of firings skipped because the previous invocation was
    /// still running.
    pub fn skipped_firings(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Install a recurring trigger for a timer behaviour.
pub fn install(
    behaviour: Arc<dyn TimerBehaviour>,
    period: Duration,
    budget: Duration,
    conduit: Arc<dyn EgressConduit>,
) -> TimerHandle {
    let skipped = Arc::new(AtomicU64::new(0));
    let skipped_in_task = skipped.clone();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the first
        // invocation happens one full period after installation.
        interval.tick().await;

        loop {
            interval.tick().await;
            let started = tokio::time::Instant::now();

            let invocation = AssertUnwindSafe(behaviour.tick()).catch_unwind();
            match tokio::time::timeout(budget, invocation).await {
                Ok(Ok(set)) => {
                    debug!(behaviour = behaviour.name(), outcomes = set.len(), "Timer tick completed");
                    conduit.forward(set).await;
                }
                Ok(Err(_panic)) => {
                    error!(behaviour = behaviour.name(), "Timer behaviour panicked");
                }
                Err(_) => {
                    error!(
                        behaviour = behaviour.name(),
                        budget_ms = budget.as_millis() as u64,
                        "Timer behaviour exceeded its budget"
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= period && !period.is_zero() {
                let missed = (elapsed.as_nanos() / period.as_nanos()) as u64;
                skipped_in_task.fetch_add(missed, Ordering::Relaxed);
                warn!(
                    behaviour = behaviour.name(),
                    missed,
                    "Timer invocation outlasted its period; skipping overlapped firings"
                );
            }
        }
    });

    TimerHandle { task, skipped }
}
