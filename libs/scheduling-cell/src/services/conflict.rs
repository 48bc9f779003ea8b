use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::interval::overlaps;
use shared_store::{DocumentStore, Filter};

use crate::models::{Reservation, SchedulingError, RESERVATIONS_COLLECTION};

pub struct ConflictService {
    store: Arc<dyn DocumentStore>,
}

impl ConflictService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whether any of the given reservations occupies part of
    /// [start, end). Cancelled reservations never count.
    pub fn has_conflict(
        reservations: &[Reservation],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        reservations.iter().any(|r| {
            r.status.occupies_interval() && overlaps(start, end, r.start_time, r.end_time)
        })
    }

    /// The doctor's reservations colliding with the candidate interval,
    /// ordered by start time. `exclude_reservation_id` supports
    /// reschedule-in-place: a moved reservation is checked against all
    /// others except itself.
    pub async fn conflicting_reservations(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_reservation_id: Option<Uuid>,
    ) -> Result<Vec<Reservation>, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidInterval(format!(
                "start {} must be before end {}",
                start, end
            )));
        }

        debug!(
            "Checking conflicts for doctor {} from {} to {}",
            doctor_id, start, end
        );

        let docs = self
            .store
            .query(
                RESERVATIONS_COLLECTION,
                &[Filter::eq("doctor_id", doctor_id.to_string())],
            )
            .await
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        let mut conflicting = Vec::new();
        for doc in docs {
            let reservation: Reservation = doc
                .parse()
                .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

            if exclude_reservation_id == Some(reservation.id) {
                continue;
            }
            if !reservation.status.occupies_interval() {
                continue;
            }
            if overlaps(start, end, reservation.start_time, reservation.end_time) {
                conflicting.push(reservation);
            }
        }

        conflicting.sort_by_key(|r| r.start_time);

        if !conflicting.is_empty() {
            warn!(
                "Conflict detected for doctor {}: {} overlapping reservations",
                doctor_id,
                conflicting.len()
            );
        }

        Ok(conflicting)
    }

    /// Whether [start, end) is free for the doctor.
    pub async fn is_available(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_reservation_id: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        let conflicting = self
            .conflicting_reservations(doctor_id, start, end, exclude_reservation_id)
            .await?;
        Ok(conflicting.is_empty())
    }
}
