// libs/shift-cell/src/services/shifts.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::interval::{minute_of_day, overlaps};
use shared_store::{DocumentStore, Filter};

use crate::models::{
    weekday_index, CreateShiftRequest, ShiftError, UpdateShiftRequest, WorkShift,
    SHIFTS_COLLECTION,
};

pub struct ShiftService {
    store: Arc<dyn DocumentStore>,
}

impl ShiftService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create an availability shift for a doctor.
    pub async fn create_shift(&self, request: CreateShiftRequest) -> Result<WorkShift, ShiftError> {
        debug!("Creating shift for doctor {}", request.doctor_id);

        validate_recurrence(request.day_of_week, request.date)?;
        validate_interval(request.start_time, request.end_time)?;

        self.check_shift_conflicts(
            request.doctor_id,
            request.day_of_week,
            request.date,
            request.start_time,
            request.end_time,
            None,
        )
        .await?;

        let now = Utc::now();
        let shift_data = json!({
            "doctor_id": request.doctor_id,
            "day_of_week": request.day_of_week,
            "date": request.date,
            "start_time": request.start_time.format("%H:%M").to_string(),
            "end_time": request.end_time.format("%H:%M").to_string(),
            "room_id": request.room_id,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let doc = self
            .store
            .insert(SHIFTS_COLLECTION, shift_data)
            .await
            .map_err(|e| ShiftError::StoreError(e.to_string()))?;

        let shift: WorkShift = doc
            .parse()
            .map_err(|e| ShiftError::StoreError(e.to_string()))?;
        debug!("Shift created with id {}", shift.id);

        Ok(shift)
    }

    /// Update an existing shift's window or room.
    pub async fn update_shift(
        &self,
        shift_id: Uuid,
        request: UpdateShiftRequest,
    ) -> Result<WorkShift, ShiftError> {
        debug!("Updating shift {}", shift_id);

        let current = self.get_shift(shift_id).await?;

        let new_start = request.start_time.unwrap_or(current.start_time);
        let new_end = request.end_time.unwrap_or(current.end_time);
        validate_interval(new_start, new_end)?;

        self.check_shift_conflicts(
            current.doctor_id,
            current.day_of_week,
            current.date,
            new_start,
            new_end,
            Some(shift_id),
        )
        .await?;

        let mut update_data = Map::new();
        if let Some(start_time) = request.start_time {
            update_data.insert(
                "start_time".to_string(),
                json!(start_time.format("%H:%M").to_string()),
            );
        }
        if let Some(end_time) = request.end_time {
            update_data.insert(
                "end_time".to_string(),
                json!(end_time.format("%H:%M").to_string()),
            );
        }
        if let Some(room_id) = request.room_id {
            update_data.insert("room_id".to_string(), json!(room_id));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let doc = self
            .store
            .update(
                SHIFTS_COLLECTION,
                &shift_id.to_string(),
                Value::Object(update_data),
            )
            .await
            .map_err(|e| match e {
                shared_store::StoreError::NotFound => ShiftError::NotFound,
                other => ShiftError::StoreError(other.to_string()),
            })?;

        doc.parse().map_err(|e| ShiftError::StoreError(e.to_string()))
    }

    /// Remove a shift. Slots already materialized from it are kept as
    /// history.
    pub async fn delete_shift(&self, shift_id: Uuid) -> Result<(), ShiftError> {
        debug!("Deleting shift {}", shift_id);

        self.store
            .delete(SHIFTS_COLLECTION, &shift_id.to_string())
            .await
            .map_err(|e| match e {
                shared_store::StoreError::NotFound => ShiftError::NotFound,
                other => ShiftError::StoreError(other.to_string()),
            })
    }

    pub async fn get_shift(&self, shift_id: Uuid) -> Result<WorkShift, ShiftError> {
        let doc = self
            .store
            .get(SHIFTS_COLLECTION, &shift_id.to_string())
            .await
            .map_err(|e| ShiftError::StoreError(e.to_string()))?
            .ok_or(ShiftError::NotFound)?;

        doc.parse().map_err(|e| ShiftError::StoreError(e.to_string()))
    }

    /// All live shifts for a doctor, ordered by recurrence then start time.
    pub async fn list_doctor_shifts(&self, doctor_id: Uuid) -> Result<Vec<WorkShift>, ShiftError> {
        let mut shifts = self.fetch_doctor_shifts(doctor_id).await?;

        shifts.sort_by_key(|s| {
            (
                s.date,
                s.day_of_week.unwrap_or(0),
                minute_of_day(s.start_time),
            )
        });

        Ok(shifts)
    }

    /// The shifts contributing bookable time on a specific date: recurring
    /// shifts matching the weekday plus shifts pinned to that exact date.
    pub async fn shifts_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<WorkShift>, ShiftError> {
        let mut shifts = self.fetch_doctor_shifts(doctor_id).await?;
        shifts.retain(|s| s.applies_on(date));
        shifts.sort_by_key(|s| minute_of_day(s.start_time));
        Ok(shifts)
    }

    async fn fetch_doctor_shifts(&self, doctor_id: Uuid) -> Result<Vec<WorkShift>, ShiftError> {
        let docs = self
            .store
            .query(
                SHIFTS_COLLECTION,
                &[Filter::eq("doctor_id", doctor_id.to_string())],
            )
            .await
            .map_err(|e| ShiftError::StoreError(e.to_string()))?;

        let mut shifts = Vec::with_capacity(docs.len());
        for doc in docs {
            let shift: WorkShift = doc
                .parse()
                .map_err(|e| ShiftError::StoreError(e.to_string()))?;
            shifts.push(shift);
        }

        Ok(shifts)
    }

    async fn check_shift_conflicts(
        &self,
        doctor_id: Uuid,
        day_of_week: Option<i32>,
        date: Option<NaiveDate>,
        start_time: NaiveTime,
        end_time: NaiveTime,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ShiftError> {
        let existing = self.fetch_doctor_shifts(doctor_id).await?;

        for shift in existing {
            if exclude_id == Some(shift.id) {
                continue;
            }
            if !recurrence_intersects(&shift, day_of_week, date) {
                continue;
            }
            if overlaps(
                minute_of_day(start_time),
                minute_of_day(end_time),
                minute_of_day(shift.start_time),
                minute_of_day(shift.end_time),
            ) {
                warn!(
                    "Shift conflict for doctor {}: {}-{} collides with shift {}",
                    doctor_id, start_time, end_time, shift.id
                );
                return Err(ShiftError::ShiftOverlap);
            }
        }

        Ok(())
    }
}

/// Whether an existing shift and a candidate recurrence can ever land on the
/// same calendar day. A date-pinned shift collides with a recurring one when
/// the pinned date falls on that weekday.
fn recurrence_intersects(
    existing: &WorkShift,
    day_of_week: Option<i32>,
    date: Option<NaiveDate>,
) -> bool {
    match (day_of_week, date) {
        (Some(dow), None) => {
            existing.day_of_week == Some(dow)
                || existing
                    .date
                    .map(|pinned| weekday_index(pinned) == dow)
                    .unwrap_or(false)
        }
        (None, Some(pinned)) => {
            existing.date == Some(pinned)
                || existing.day_of_week == Some(weekday_index(pinned))
        }
        _ => false,
    }
}

fn validate_recurrence(day_of_week: Option<i32>, date: Option<NaiveDate>) -> Result<(), ShiftError> {
    match (day_of_week, date) {
        (Some(dow), None) => {
            if !(0..=6).contains(&dow) {
                return Err(ShiftError::InvalidDayOfWeek(dow));
            }
            Ok(())
        }
        (None, Some(_)) => Ok(()),
        _ => Err(ShiftError::ValidationError(
            "exactly one of day_of_week and date must be set".to_string(),
        )),
    }
}

fn validate_interval(start_time: NaiveTime, end_time: NaiveTime) -> Result<(), ShiftError> {
    if minute_of_day(start_time) >= minute_of_day(end_time) {
        return Err(ShiftError::InvalidInterval(format!(
            "start {} must be before end {}",
            start_time, end_time
        )));
    }
    Ok(())
}
