// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_store::AppState;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Slot generation and listing
        .route("/slots", get(handlers::list_slots))
        .route("/slots/generate", post(handlers::generate_slots))
        // Booking
        .route("/book", post(handlers::book_slot))
        .route("/book/adhoc", post(handlers::book_adhoc))
        // Reservations
        .route("/reservations/{reservation_id}", get(handlers::get_reservation))
        .route(
            "/reservations/{reservation_id}/accept",
            post(handlers::accept_reservation),
        )
        .route(
            "/reservations/{reservation_id}/cancel",
            post(handlers::cancel_reservation),
        )
        .route(
            "/reservations/{reservation_id}/complete",
            post(handlers::complete_reservation),
        )
        .route(
            "/doctors/{doctor_id}/reservations",
            get(handlers::list_doctor_reservations),
        )
        // Utility endpoints
        .route("/availability/check", get(handlers::check_availability))
        .with_state(state)
}
