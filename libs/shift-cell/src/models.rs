// libs/shift-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::timefmt;

pub const SHIFTS_COLLECTION: &str = "work_shifts";

/// A recurring or date-pinned availability window for a doctor. Exactly one
/// of `day_of_week` (0 = Sunday .. 6 = Saturday) and `date` is set.
/// Administrative staff create and edit shifts; the booking flow only reads
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkShift {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(with = "timefmt")]
    pub start_time: NaiveTime,
    #[serde(with = "timefmt")]
    pub end_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkShift {
    /// Whether this shift contributes bookable time on the given date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if let Some(pinned) = self.date {
            return pinned == date;
        }
        self.day_of_week == Some(weekday_index(date))
    }
}

/// Day-of-week convention used across the record set: 0 = Sunday.
pub fn weekday_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShiftRequest {
    pub doctor_id: Uuid,
    pub day_of_week: Option<i32>,
    pub date: Option<NaiveDate>,
    #[serde(with = "timefmt")]
    pub start_time: NaiveTime,
    #[serde(with = "timefmt")]
    pub end_time: NaiveTime,
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateShiftRequest {
    #[serde(default, with = "timefmt::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "timefmt::option")]
    pub end_time: Option<NaiveTime>,
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ShiftError {
    #[error("Shift not found")]
    NotFound,

    #[error("Invalid shift interval: {0}")]
    InvalidInterval(String),

    #[error("Shift overlaps an existing schedule")]
    ShiftOverlap,

    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidDayOfWeek(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StoreError(String),
}
