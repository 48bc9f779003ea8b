// libs/scheduling-cell/tests/handlers_test.rs
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::NaiveTime;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;
use shared_store::{AppState, DocumentStore, MemoryStore};
use shift_cell::models::CreateShiftRequest;
use shift_cell::services::shifts::ShiftService;

async fn test_state(allow_adhoc_booking: bool) -> Arc<AppState> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let config = AppConfig {
        store_url: String::new(),
        store_api_key: String::new(),
        default_slot_minutes: 30,
        allow_adhoc_booking,
    };
    Arc::new(AppState::new(config, store))
}

async fn seed_friday_shift(state: &Arc<AppState>, doctor_id: Uuid) {
    ShiftService::new(Arc::clone(&state.store))
        .create_shift(CreateShiftRequest {
            doctor_id,
            day_of_week: Some(5),
            date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            room_id: None,
        })
        .await
        .unwrap();
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn generate_then_list_slots() {
    let state = test_state(true).await;
    let doctor_id = Uuid::new_v4();
    seed_friday_shift(&state, doctor_id).await;

    let app = scheduling_routes(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(post_json(
            "/slots/generate",
            json!({ "doctor_id": doctor_id, "date": "2025-06-20" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["skipped"], 0);

    let uri = format!("/slots?doctor_id={}&date=2025-06-20", doctor_id);
    let response = app
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["start"], "09:00");
    assert_eq!(slots[1]["start"], "09:30");
    assert_eq!(slots[0]["booked"], false);
}

#[tokio::test]
async fn booking_twice_answers_conflict() {
    let state = test_state(true).await;
    let doctor_id = Uuid::new_v4();
    seed_friday_shift(&state, doctor_id).await;

    let app = scheduling_routes(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(post_json(
            "/slots/generate",
            json!({ "doctor_id": doctor_id, "date": "2025-06-20" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let slot_id = body["created"][0]["id"].as_str().unwrap().to_string();

    let book = json!({ "slot_id": slot_id, "patient_id": Uuid::new_v4(), "meta": null });

    let response = app.clone().oneshot(post_json("/book", book.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reservation"]["status"], "pending");

    let response = app.oneshot(post_json("/book", book)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booking_unknown_slot_answers_not_found() {
    let state = test_state(true).await;
    let app = scheduling_routes(state);

    let response = app
        .oneshot(post_json(
            "/book",
            json!({ "slot_id": Uuid::new_v4(), "patient_id": Uuid::new_v4(), "meta": null }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adhoc_route_respects_the_policy_flag() {
    let state = test_state(false).await;
    let app = scheduling_routes(state);

    let response = app
        .oneshot(post_json(
            "/book/adhoc",
            json!({
                "doctor_id": Uuid::new_v4(),
                "patient_id": Uuid::new_v4(),
                "start_time": "2025-06-20T09:00:00Z",
                "end_time": "2025-06-20T09:30:00Z",
                "meta": null
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn availability_check_reports_conflicts() {
    let state = test_state(true).await;
    let doctor_id = Uuid::new_v4();
    let app = scheduling_routes(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(post_json(
            "/book/adhoc",
            json!({
                "doctor_id": doctor_id,
                "patient_id": Uuid::new_v4(),
                "start_time": "2025-06-20T09:00:00Z",
                "end_time": "2025-06-20T09:30:00Z",
                "meta": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!(
        "/availability/check?doctor_id={}&start_time=2025-06-20T09:15:00Z&end_time=2025-06-20T09:45:00Z",
        doctor_id
    );
    let response = app
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["available"], false);
    assert_eq!(
        body["conflicting_reservations"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn reservation_lifecycle_over_http() {
    let state = test_state(true).await;
    let doctor_id = Uuid::new_v4();
    let app = scheduling_routes(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(post_json(
            "/book/adhoc",
            json!({
                "doctor_id": doctor_id,
                "patient_id": Uuid::new_v4(),
                "start_time": "2025-06-20T09:00:00Z",
                "end_time": "2025-06-20T09:30:00Z",
                "meta": null
            }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let reservation_id = body["reservation"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/reservations/{}/accept", reservation_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reservation"]["status"], "accepted");

    // Completed is terminal; cancelling afterwards is rejected.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/reservations/{}/complete", reservation_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            &format!("/reservations/{}/cancel", reservation_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
