// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::{
    BookAdhocRequest, BookSlotRequest, GenerateSlotsRequest, ReservationSearchQuery,
    ReservationStatus, SchedulingError,
};
use crate::services::booking::BookingService;
use crate::services::slots::SlotGeneratorService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub only_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityCheckParams {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_reservation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReservationQueryParams {
    pub status: Option<ReservationStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = SlotGeneratorService::new(Arc::clone(&state.store));

    let slots = service
        .list_slots(
            params.doctor_id,
            params.date,
            params.only_available.unwrap_or(false),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "doctor_id": params.doctor_id,
        "date": params.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn generate_slots(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotGeneratorService::new(Arc::clone(&state.store));
    let slot_minutes = request
        .slot_minutes
        .unwrap_or(state.config.default_slot_minutes);

    let outcome = service
        .materialize_slots(request.doctor_id, request.date, slot_minutes)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "created": outcome.created,
        "skipped": outcome.skipped
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);

    let reservation = service.book_slot(request).await.map_err(|e| match e {
        SchedulingError::SlotNotFound => {
            AppError::NotFound("Slot does not exist".to_string())
        }
        SchedulingError::SlotAlreadyBooked => {
            AppError::Conflict("Someone else just took this slot".to_string())
        }
        other => map_scheduling_error(other),
    })?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

#[axum::debug_handler]
pub async fn book_adhoc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookAdhocRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);

    let reservation = service.book_adhoc(request).await.map_err(|e| match e {
        SchedulingError::OverlapConflict => {
            AppError::Conflict("Requested time conflicts with an existing reservation".to_string())
        }
        SchedulingError::AdhocBookingDisabled => {
            AppError::BadRequest("Ad hoc booking is disabled; book a generated slot".to_string())
        }
        other => map_scheduling_error(other),
    })?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

// ==============================================================================
// RESERVATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);

    let reservation = service
        .get_reservation(reservation_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "reservation": reservation })))
}

#[axum::debug_handler]
pub async fn list_doctor_reservations(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Query(params): Query<ReservationQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);

    let query = ReservationSearchQuery {
        status: params.status,
        from_date: params.from_date,
        to_date: params.to_date,
        limit: params.limit,
    };

    let reservations = service
        .search_reservations(doctor_id, query)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "reservations": reservations
    })))
}

#[axum::debug_handler]
pub async fn accept_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);
    let reservation = service
        .accept_reservation(reservation_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "success": true, "reservation": reservation })))
}

#[axum::debug_handler]
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);
    let reservation = service
        .cancel_reservation(reservation_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "success": true, "reservation": reservation })))
}

#[axum::debug_handler]
pub async fn complete_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);
    let reservation = service
        .complete_reservation(reservation_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "success": true, "reservation": reservation })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityCheckParams>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(Arc::clone(&state.store), &state.config);

    let response = service
        .check_availability(
            params.doctor_id,
            params.start_time,
            params.end_time,
            params.exclude_reservation_id,
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!(response)))
}

fn map_scheduling_error(error: SchedulingError) -> AppError {
    match error {
        SchedulingError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        SchedulingError::ReservationNotFound => {
            AppError::NotFound("Reservation not found".to_string())
        }
        SchedulingError::SlotAlreadyBooked => {
            AppError::Conflict("Slot is already booked".to_string())
        }
        SchedulingError::OverlapConflict => {
            AppError::Conflict("Interval conflicts with an existing reservation".to_string())
        }
        SchedulingError::InvalidInterval(msg) => AppError::BadRequest(msg),
        SchedulingError::InvalidStatusTransition(status) => AppError::BadRequest(format!(
            "Reservation cannot change status from {}",
            status
        )),
        SchedulingError::AdhocBookingDisabled => {
            AppError::BadRequest("Ad hoc booking is disabled".to_string())
        }
        SchedulingError::ShiftError(msg) => AppError::Internal(msg),
        SchedulingError::StoreError(msg) => AppError::Storage(msg),
    }
}
