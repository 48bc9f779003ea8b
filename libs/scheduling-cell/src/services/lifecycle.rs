// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{ReservationStatus, SchedulingError};

pub struct ReservationLifecycleService;

impl ReservationLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed.
    pub fn validate_status_transition(
        &self,
        current_status: &ReservationStatus,
        new_status: &ReservationStatus,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Validating status transition from {} to {}",
            current_status, new_status
        );

        if !self
            .valid_transitions(current_status)
            .contains(new_status)
        {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(SchedulingError::InvalidStatusTransition(
                current_status.clone(),
            ));
        }

        Ok(())
    }

    /// All valid next statuses for a given current status. Completed and
    /// cancelled are terminal; records are kept, never deleted.
    pub fn valid_transitions(&self, current_status: &ReservationStatus) -> Vec<ReservationStatus> {
        match current_status {
            ReservationStatus::Pending => vec![
                ReservationStatus::Accepted,
                ReservationStatus::Cancelled,
            ],
            ReservationStatus::Accepted => vec![
                ReservationStatus::Completed,
                ReservationStatus::Cancelled,
            ],
            ReservationStatus::Completed => vec![],
            ReservationStatus::Cancelled => vec![],
        }
    }
}

impl Default for ReservationLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
