// libs/appointment-cell/src/services/consistency.rs
//
// Per-calendar write serialization. The conflict check and the write that
// follows it are two separate store calls, so two requests for the same
// calendar could both pass the check before either persists. Holding the
// scope lock across check-then-write closes that window within a process;
// the database exclusion constraint covers multiple processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::models::{AppointmentError, CalendarScope};

const PRUNE_THRESHOLD: usize = 1024;

pub struct SchedulingLocks {
    locks: Mutex<HashMap<CalendarScope, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

/// Held for the duration of one write; dropping it releases every scope.
#[derive(Debug)]
#[must_use = "scopes are released as soon as the guard is dropped"]
pub struct ScopeGuards {
    scopes: Vec<CalendarScope>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ScopeGuards {
    pub fn scopes(&self) -> &[CalendarScope] {
        &self.scopes
    }
}

impl SchedulingLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Lock every scope, always in sorted order so overlapping scope sets
    /// cannot deadlock against each other.
    pub async fn acquire(&self, scopes: &[CalendarScope]) -> Result<ScopeGuards, AppointmentError> {
        let mut ordered = scopes.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for scope in &ordered {
            let lock = self.lock_for(*scope);
            match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    warn!("Timed out after {:?} waiting for scheduling lock on {}", self.timeout, scope);
                    return Err(AppointmentError::LockTimeout(scope.to_string()));
                }
            }
        }

        debug!("Scheduling locks acquired: {:?}", ordered);
        Ok(ScopeGuards { scopes: ordered, _guards: guards })
    }

    /// Number of scopes with a live lock entry.
    pub fn tracked_scopes(&self) -> usize {
        self.registry().len()
    }

    fn lock_for(&self, scope: CalendarScope) -> Arc<AsyncMutex<()>> {
        let mut locks = self.registry();

        if locks.len() > PRUNE_THRESHOLD {
            // Entries only referenced by the map have no holder or waiter.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks.entry(scope).or_default().clone()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<CalendarScope, Arc<AsyncMutex<()>>>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
