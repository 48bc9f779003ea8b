// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_store::{DocumentStore, Filter, StoreError, WriteBatch};

use crate::models::{
    AvailabilityCheckResponse, BookAdhocRequest, BookSlotRequest, Reservation,
    ReservationSearchQuery, ReservationStatus, SchedulingError, TimeSlot,
    RESERVATIONS_COLLECTION, SLOTS_COLLECTION,
};
use crate::services::conflict::ConflictService;
use crate::services::lifecycle::ReservationLifecycleService;

pub struct BookingService {
    store: Arc<dyn DocumentStore>,
    conflict_service: ConflictService,
    lifecycle_service: ReservationLifecycleService,
    allow_adhoc_booking: bool,
    max_commit_attempts: u32,
}

impl BookingService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self {
            conflict_service: ConflictService::new(Arc::clone(&store)),
            lifecycle_service: ReservationLifecycleService::new(),
            allow_adhoc_booking: config.allow_adhoc_booking,
            max_commit_attempts: 3,
            store,
        }
    }

    /// Claim a generated slot and create its reservation as one atomic
    /// commit.
    ///
    /// The slot is read, verified unbooked, then flipped together with the
    /// reservation insert under a revision precondition; two patients racing
    /// for the same slot cannot both succeed. Store-level contention is
    /// retried; a retry that finds the slot taken aborts with
    /// `SlotAlreadyBooked` so the caller can offer another slot.
    pub async fn book_slot(&self, request: BookSlotRequest) -> Result<Reservation, SchedulingError> {
        info!(
            "Booking slot {} for patient {}",
            request.slot_id, request.patient_id
        );

        for attempt in 1..=self.max_commit_attempts {
            let doc = self
                .store
                .get(SLOTS_COLLECTION, &request.slot_id.to_string())
                .await
                .map_err(|e| SchedulingError::StoreError(e.to_string()))?
                .ok_or(SchedulingError::SlotNotFound)?;

            let slot: TimeSlot = doc
                .parse()
                .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

            if slot.booked {
                return Err(SchedulingError::SlotAlreadyBooked);
            }

            let now = Utc::now();
            let reservation_data = json!({
                "doctor_id": slot.doctor_id,
                "patient_id": request.patient_id,
                "start_time": slot.start_datetime().to_rfc3339(),
                "end_time": slot.end_datetime().to_rfc3339(),
                "status": ReservationStatus::Pending.to_string(),
                "slot_id": slot.id,
                "meta": request.meta,
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339()
            });

            let batch = WriteBatch::new()
                .require_revision(SLOTS_COLLECTION, doc.id.clone(), doc.revision)
                .update(SLOTS_COLLECTION, doc.id.clone(), json!({ "booked": true }))
                .insert(RESERVATIONS_COLLECTION, reservation_data);

            match self.store.commit(batch).await {
                Ok(docs) => {
                    let reservation_doc = docs.into_iter().nth(1).ok_or_else(|| {
                        SchedulingError::StoreError(
                            "commit returned no reservation document".to_string(),
                        )
                    })?;
                    let reservation: Reservation = reservation_doc
                        .parse()
                        .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

                    info!(
                        "Slot {} booked as reservation {} for patient {}",
                        slot.id, reservation.id, request.patient_id
                    );
                    return Ok(reservation);
                }
                Err(StoreError::Contention) if attempt < self.max_commit_attempts => {
                    warn!(
                        "Slot {} claim contended, retrying {}/{}",
                        slot.id, attempt, self.max_commit_attempts
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64))
                        .await;
                }
                Err(StoreError::Contention) => {
                    return Err(SchedulingError::SlotAlreadyBooked);
                }
                Err(e) => return Err(SchedulingError::StoreError(e.to_string())),
            }
        }

        Err(SchedulingError::StoreError(
            "failed to book slot after repeated contention".to_string(),
        ))
    }

    /// Book an arbitrary doctor/time interval without a precomputed slot.
    ///
    /// Best-effort admission: the doctor's reservations are scanned and the
    /// overlap recomputed here, but the scan and the insert are not
    /// isolated, so a reservation committed in between is not detected.
    /// Deployments that want the linearizable guarantee disable this path
    /// and book generated slots only.
    pub async fn book_adhoc(
        &self,
        request: BookAdhocRequest,
    ) -> Result<Reservation, SchedulingError> {
        if !self.allow_adhoc_booking {
            return Err(SchedulingError::AdhocBookingDisabled);
        }

        info!(
            "Ad hoc booking for doctor {} from {} to {}",
            request.doctor_id, request.start_time, request.end_time
        );

        let conflicting = self
            .conflict_service
            .conflicting_reservations(request.doctor_id, request.start_time, request.end_time, None)
            .await?;

        if !conflicting.is_empty() {
            return Err(SchedulingError::OverlapConflict);
        }

        let now = Utc::now();
        let reservation_data = json!({
            "doctor_id": request.doctor_id,
            "patient_id": request.patient_id,
            "start_time": request.start_time.to_rfc3339(),
            "end_time": request.end_time.to_rfc3339(),
            "status": ReservationStatus::Pending.to_string(),
            "meta": request.meta,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let doc = self
            .store
            .insert(RESERVATIONS_COLLECTION, reservation_data)
            .await
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        let reservation: Reservation = doc
            .parse()
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        info!("Ad hoc reservation {} created", reservation.id);
        Ok(reservation)
    }

    pub async fn get_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Reservation, SchedulingError> {
        debug!("Fetching reservation {}", reservation_id);

        let doc = self
            .store
            .get(RESERVATIONS_COLLECTION, &reservation_id.to_string())
            .await
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?
            .ok_or(SchedulingError::ReservationNotFound)?;

        doc.parse()
            .map_err(|e| SchedulingError::StoreError(e.to_string()))
    }

    /// A doctor's reservations, newest first, optionally filtered by status
    /// and date window.
    pub async fn search_reservations(
        &self,
        doctor_id: Uuid,
        query: ReservationSearchQuery,
    ) -> Result<Vec<Reservation>, SchedulingError> {
        debug!("Searching reservations for doctor {}", doctor_id);

        let mut filters = vec![Filter::eq("doctor_id", doctor_id.to_string())];
        if let Some(status) = &query.status {
            filters.push(Filter::eq("status", status.to_string()));
        }

        let docs = self
            .store
            .query(RESERVATIONS_COLLECTION, &filters)
            .await
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        let mut reservations = Vec::with_capacity(docs.len());
        for doc in docs {
            let reservation: Reservation = doc
                .parse()
                .map_err(|e| SchedulingError::StoreError(e.to_string()))?;
            reservations.push(reservation);
        }

        // The store only filters by equality; the date window is applied
        // here.
        if let Some(from_date) = query.from_date {
            reservations.retain(|r| r.start_time >= from_date);
        }
        if let Some(to_date) = query.to_date {
            reservations.retain(|r| r.start_time <= to_date);
        }

        reservations.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        if let Some(limit) = query.limit {
            reservations.truncate(limit);
        }

        Ok(reservations)
    }

    pub async fn accept_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Reservation, SchedulingError> {
        self.transition(reservation_id, ReservationStatus::Accepted)
            .await
    }

    /// Cancelling keeps the record but frees the interval for subsequent
    /// availability checks. The originating slot, if any, stays booked:
    /// its flag transitions once and the slot is retained as history.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Reservation, SchedulingError> {
        self.transition(reservation_id, ReservationStatus::Cancelled)
            .await
    }

    pub async fn complete_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Reservation, SchedulingError> {
        self.transition(reservation_id, ReservationStatus::Completed)
            .await
    }

    pub async fn check_availability(
        &self,
        doctor_id: Uuid,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
        exclude_reservation_id: Option<Uuid>,
    ) -> Result<AvailabilityCheckResponse, SchedulingError> {
        let conflicting = self
            .conflict_service
            .conflicting_reservations(doctor_id, start, end, exclude_reservation_id)
            .await?;

        Ok(AvailabilityCheckResponse {
            available: conflicting.is_empty(),
            conflicting_reservations: conflicting,
        })
    }

    async fn transition(
        &self,
        reservation_id: Uuid,
        new_status: ReservationStatus,
    ) -> Result<Reservation, SchedulingError> {
        debug!("Transitioning reservation {} to {}", reservation_id, new_status);

        let current = self.get_reservation(reservation_id).await?;
        self.lifecycle_service
            .validate_status_transition(&current.status, &new_status)?;

        let doc = self
            .store
            .update(
                RESERVATIONS_COLLECTION,
                &reservation_id.to_string(),
                json!({
                    "status": new_status.to_string(),
                    "updated_at": Utc::now().to_rfc3339()
                }),
            )
            .await
            .map_err(|e| match e {
                StoreError::NotFound => SchedulingError::ReservationNotFound,
                other => SchedulingError::StoreError(other.to_string()),
            })?;

        let reservation: Reservation = doc
            .parse()
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        info!("Reservation {} is now {}", reservation_id, new_status);
        Ok(reservation)
    }
}
