// libs/shift-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::{CreateShiftRequest, ShiftError, UpdateShiftRequest};
use crate::services::shifts::ShiftService;

#[axum::debug_handler]
pub async fn create_shift(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateShiftRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ShiftService::new(Arc::clone(&state.store));

    let shift = service.create_shift(request).await.map_err(map_shift_error)?;

    Ok(Json(json!({
        "success": true,
        "shift": shift
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_shifts(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ShiftService::new(Arc::clone(&state.store));

    let shifts = service
        .list_doctor_shifts(doctor_id)
        .await
        .map_err(map_shift_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "shifts": shifts
    })))
}

#[axum::debug_handler]
pub async fn update_shift(
    State(state): State<Arc<AppState>>,
    Path(shift_id): Path<Uuid>,
    Json(request): Json<UpdateShiftRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ShiftService::new(Arc::clone(&state.store));

    let shift = service
        .update_shift(shift_id, request)
        .await
        .map_err(map_shift_error)?;

    Ok(Json(json!({
        "success": true,
        "shift": shift
    })))
}

#[axum::debug_handler]
pub async fn delete_shift(
    State(state): State<Arc<AppState>>,
    Path(shift_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ShiftService::new(Arc::clone(&state.store));

    service.delete_shift(shift_id).await.map_err(map_shift_error)?;

    Ok(Json(json!({
        "success": true
    })))
}

fn map_shift_error(error: ShiftError) -> AppError {
    match error {
        ShiftError::NotFound => AppError::NotFound("Shift not found".to_string()),
        ShiftError::ShiftOverlap => {
            AppError::Conflict("Shift overlaps an existing schedule".to_string())
        }
        ShiftError::InvalidInterval(msg) => AppError::BadRequest(msg),
        ShiftError::InvalidDayOfWeek(day) => AppError::BadRequest(format!(
            "Day of week must be between 0 (Sunday) and 6 (Saturday), got {}",
            day
        )),
        ShiftError::ValidationError(msg) => AppError::ValidationError(msg),
        ShiftError::StoreError(msg) => AppError::Storage(msg),
    }
}
