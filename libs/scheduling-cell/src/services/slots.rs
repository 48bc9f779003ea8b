// libs/scheduling-cell/src/services/slots.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::interval::minute_of_day;
use shared_store::{DocumentStore, Filter, StoreError, WriteBatch};
use shift_cell::models::WorkShift;
use shift_cell::services::shifts::ShiftService;

use crate::models::{
    SchedulingError, SlotCandidate, SlotMaterialization, TimeSlot, SLOTS_COLLECTION,
};

pub struct SlotGeneratorService {
    store: Arc<dyn DocumentStore>,
    shift_service: ShiftService,
}

impl SlotGeneratorService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            shift_service: ShiftService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Derive the bookable intervals for a doctor on a date from the given
    /// shifts. Pure: no storage is touched.
    ///
    /// Each shift is walked from start to end in `slot_minutes` steps; a
    /// trailing window shorter than one slot is dropped, never rounded up.
    /// Candidates from different shifts are de-duplicated by
    /// (start, end, room) to absorb administrator-entered overlapping shift
    /// definitions, then ordered by start time. A doctor with no shift on
    /// the date yields an empty list.
    pub fn generate_candidates(
        doctor_id: Uuid,
        date: NaiveDate,
        shifts: &[WorkShift],
        slot_minutes: u32,
    ) -> Result<Vec<SlotCandidate>, SchedulingError> {
        if slot_minutes == 0 {
            return Err(SchedulingError::InvalidInterval(
                "slot duration must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for shift in shifts.iter().filter(|s| s.applies_on(date)) {
            let shift_start = minute_of_day(shift.start_time);
            let shift_end = minute_of_day(shift.end_time);

            if shift_start >= shift_end {
                return Err(SchedulingError::InvalidInterval(format!(
                    "shift {} has start {} not before end {}",
                    shift.id, shift.start_time, shift.end_time
                )));
            }

            let mut cursor = shift_start;
            while cursor + slot_minutes <= shift_end {
                let slot_end = cursor + slot_minutes;
                if seen.insert((cursor, slot_end, shift.room_id.clone())) {
                    candidates.push(SlotCandidate {
                        doctor_id,
                        date,
                        start: time_from_minutes(cursor),
                        end: time_from_minutes(slot_end),
                        room_id: shift.room_id.clone(),
                    });
                }
                cursor = slot_end;
            }
        }

        candidates.sort_by_key(|c| (minute_of_day(c.start), minute_of_day(c.end)));

        debug!(
            "Generated {} slot candidates for doctor {} on {}",
            candidates.len(),
            doctor_id,
            date
        );
        Ok(candidates)
    }

    /// Persist the day's candidates that are not already present, with
    /// `booked = false`.
    ///
    /// Idempotent on the natural key (doctor, date, start): a second run
    /// against the same storage appends nothing. Concurrent runs are safe
    /// without locking because each slot is created under its natural-key
    /// id and a collision surfaces as store contention, counted as skipped.
    pub async fn materialize_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot_minutes: u32,
    ) -> Result<SlotMaterialization, SchedulingError> {
        let shifts_fut = async {
            self.shift_service
                .shifts_for_date(doctor_id, date)
                .await
                .map_err(|e| SchedulingError::ShiftError(e.to_string()))
        };
        let (shifts, existing) =
            futures::try_join!(shifts_fut, self.persisted_slots(doctor_id, date))?;

        let candidates = Self::generate_candidates(doctor_id, date, &shifts, slot_minutes)?;
        let existing_starts: HashSet<u32> =
            existing.iter().map(|s| minute_of_day(s.start)).collect();

        let mut created = Vec::new();
        let mut skipped = 0;

        for candidate in candidates {
            if existing_starts.contains(&minute_of_day(candidate.start)) {
                skipped += 1;
                continue;
            }

            let slot_id = TimeSlot::natural_id(doctor_id, date, candidate.start);
            let slot_data = json!({
                "doctor_id": candidate.doctor_id,
                "date": candidate.date,
                "start": candidate.start.format("%H:%M").to_string(),
                "end": candidate.end.format("%H:%M").to_string(),
                "booked": false,
                "room_id": candidate.room_id,
                "created_at": Utc::now().to_rfc3339()
            });

            let batch =
                WriteBatch::new().create(SLOTS_COLLECTION, slot_id.to_string(), slot_data);

            match self.store.commit(batch).await {
                Ok(docs) => {
                    let doc = docs.into_iter().next().ok_or_else(|| {
                        SchedulingError::StoreError(
                            "commit returned no document for created slot".to_string(),
                        )
                    })?;
                    let slot: TimeSlot = doc
                        .parse()
                        .map_err(|e| SchedulingError::StoreError(e.to_string()))?;
                    created.push(slot);
                }
                // Another administrator materialized this slot first.
                Err(StoreError::Contention) => skipped += 1,
                Err(e) => return Err(SchedulingError::StoreError(e.to_string())),
            }
        }

        info!(
            "Materialized {} slots for doctor {} on {} ({} already present)",
            created.len(),
            doctor_id,
            date,
            skipped
        );

        Ok(SlotMaterialization { created, skipped })
    }

    /// Persisted slots for a doctor on a date, ordered by start time.
    pub async fn list_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        only_available: bool,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let mut slots = self.persisted_slots(doctor_id, date).await?;

        if only_available {
            slots.retain(|s| !s.booked);
        }
        slots.sort_by_key(|s| minute_of_day(s.start));

        Ok(slots)
    }

    async fn persisted_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let docs = self
            .store
            .query(
                SLOTS_COLLECTION,
                &[
                    Filter::eq("doctor_id", doctor_id.to_string()),
                    Filter::eq("date", date.to_string()),
                ],
            )
            .await
            .map_err(|e| SchedulingError::StoreError(e.to_string()))?;

        let mut slots = Vec::with_capacity(docs.len());
        for doc in docs {
            let slot: TimeSlot = doc
                .parse()
                .map_err(|e| SchedulingError::StoreError(e.to_string()))?;
            slots.push(slot);
        }

        Ok(slots)
    }
}

fn time_from_minutes(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap()
}
