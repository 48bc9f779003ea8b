// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::timefmt;

pub const SLOTS_COLLECTION: &str = "time_slots";
pub const RESERVATIONS_COLLECTION: &str = "reservations";

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// A discrete bookable interval materialized from a work shift. Slots are
/// never deleted; `booked` flips false -> true exactly once, inside the
/// booking transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "timefmt")]
    pub start: NaiveTime,
    #[serde(with = "timefmt")]
    pub end: NaiveTime,
    pub booked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn start_datetime(&self) -> DateTime<Utc> {
        self.date.and_time(self.start).and_utc()
    }

    pub fn end_datetime(&self) -> DateTime<Utc> {
        self.date.and_time(self.end).and_utc()
    }

    /// Deterministic identifier derived from the natural key
    /// (doctor, date, start). Regenerating slots for a day therefore
    /// collides on the same ids instead of duplicating records, no matter
    /// how many administrators run the generator at once.
    pub fn natural_id(doctor_id: Uuid, date: NaiveDate, start: NaiveTime) -> Uuid {
        let key = format!("{}|{}|{}", doctor_id, date, start.format("%H:%M"));
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}

/// A not-yet-persisted slot produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "timefmt")]
    pub start: NaiveTime,
    #[serde(with = "timefmt")]
    pub end: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ReservationMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Cancelled reservations free their interval; every other status keeps
    /// occupying it for overlap purposes.
    pub fn occupies_interval(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Accepted => write!(f, "accepted"),
            ReservationStatus::Completed => write!(f, "completed"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Free-form booking details carried on a reservation. Anything else a
/// client writes into the record stays in the stored document untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub meta: Option<ReservationMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAdhocRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meta: Option<ReservationMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSlotsRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_minutes: Option<u32>,
}

/// Outcome of a materialization run: what was appended and how many
/// candidates already existed (or lost the create race to a concurrent
/// administrator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMaterialization {
    pub created: Vec<TimeSlot>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationSearchQuery {
    pub status: Option<ReservationStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheckResponse {
    pub available: bool,
    pub conflicting_reservations: Vec<Reservation>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is already booked")]
    SlotAlreadyBooked,

    #[error("Requested interval conflicts with an existing reservation")]
    OverlapConflict,

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Reservation cannot change status from {0}")]
    InvalidStatusTransition(ReservationStatus),

    #[error("Ad hoc booking is disabled; book a generated slot instead")]
    AdhocBookingDisabled,

    #[error("Shift lookup failed: {0}")]
    ShiftError(String),

    #[error("Storage error: {0}")]
    StoreError(String),
}
