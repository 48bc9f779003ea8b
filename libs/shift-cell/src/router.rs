// libs/shift-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_store::AppState;

use crate::handlers;

pub fn shift_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_shift))
        .route("/doctors/{doctor_id}", get(handlers::list_doctor_shifts))
        .route("/{shift_id}", put(handlers::update_shift))
        .route("/{shift_id}", delete(handlers::delete_shift))
        .with_state(state)
}
