// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentError, ConflictCandidate, ConflictCheckResponse};
use crate::store::AppointmentStore;

/// Half-open interval intersection: `[start1, end1)` and `[start2, end2)`
/// overlap iff each starts before the other ends. Touching endpoints do not.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Whether `other` blocks `candidate`: same scope, not the candidate itself,
/// still scheduled, and intersecting.
pub fn blocks(candidate: &ConflictCandidate, other: &Appointment) -> bool {
    candidate.scope.owns(other)
        && candidate.id != Some(other.id)
        && other.is_scheduled()
        && intervals_overlap(candidate.start, candidate.end(), other.scheduled_at, other.ends_at())
}

/// Every appointment in `visible` that blocks `candidate`.
pub fn find_conflicts<'a, I>(candidate: &ConflictCandidate, visible: I) -> Vec<&'a Appointment>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    visible.into_iter().filter(|other| blocks(candidate, other)).collect()
}

/// Pure conflict predicate over whatever state the caller can see.
pub fn has_conflict<'a, I>(candidate: &ConflictCandidate, visible: I) -> bool
where
    I: IntoIterator<Item = &'a Appointment>,
{
    visible.into_iter().any(|other| blocks(candidate, other))
}

/// Runs the conflict predicate against an [`AppointmentStore`]. The store
/// narrows the search to a window; the exact test is always [`blocks`].
pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    pub async fn check_conflicts(
        &self,
        candidate: &ConflictCandidate,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking conflicts for {} from {} to {}",
               candidate.scope, candidate.start, candidate.end());

        let nearby = self.store.scheduled_in_window(
            candidate.scope,
            candidate.start,
            candidate.end(),
            candidate.id,
        ).await?;

        let conflicting_appointments: Vec<Appointment> = find_conflicts(candidate, &nearby)
            .into_iter()
            .cloned()
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();
        if has_conflict {
            warn!("Conflict detected for {} - {} conflicting appointments",
                  candidate.scope, conflicting_appointments.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        })
    }

    pub async fn has_conflict(&self, candidate: &ConflictCandidate) -> Result<bool, AppointmentError> {
        Ok(self.check_conflicts(candidate).await?.has_conflict)
    }

    /// Fails with [`AppointmentError::SchedulingConflict`] if any candidate is blocked.
    pub async fn ensure_free(&self, candidates: &[ConflictCandidate]) -> Result<(), AppointmentError> {
        for candidate in candidates {
            if self.has_conflict(candidate).await? {
                return Err(AppointmentError::SchedulingConflict);
            }
        }
        Ok(())
    }
}
