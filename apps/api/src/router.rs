use std::sync::Arc;

use axum::{routing::get, Router};

use scheduling_cell::router::scheduling_routes;
use shared_store::AppState;
use shift_cell::router::shift_routes;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/shifts", shift_routes(state.clone()))
        .nest("/scheduling", scheduling_routes(state.clone()))
}
