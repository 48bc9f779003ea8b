// libs/shared/store/tests/rest_store_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_store::{DocumentStore, Filter, RestStore, StoreError, WriteBatch};

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        store_url: base_url.to_string(),
        store_api_key: "test_key".to_string(),
        default_slot_minutes: 30,
        allow_adhoc_booking: true,
    }
}

fn doc_json(id: &str, revision: u64, body: serde_json::Value) -> serde_json::Value {
    json!({ "id": id, "revision": revision, "body": body })
}

#[tokio::test]
async fn get_parses_document_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/time_slots/slot-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(doc_json("slot-1", 3, json!({ "booked": false }))),
        )
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let doc = store.get("time_slots", "slot-1").await.unwrap().unwrap();

    assert_eq!(doc.id, "slot-1");
    assert_eq!(doc.revision, 3);
    assert_eq!(doc.body["booked"], false);
}

#[tokio::test]
async fn get_maps_404_to_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/time_slots/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let doc = store.get("time_slots", "ghost").await.unwrap();

    assert!(doc.is_none());
}

#[tokio::test]
async fn query_encodes_equality_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reservations"))
        .and(query_param("doctor_id", "eq.d1"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![doc_json(
            "res-1",
            1,
            json!({ "doctor_id": "d1", "status": "pending" }),
        )]))
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let docs = store
        .query(
            "reservations",
            &[
                Filter::eq("doctor_id", "d1"),
                Filter::eq("status", "pending"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "res-1");
}

#[tokio::test]
async fn insert_posts_body_to_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/work_shifts"))
        .and(body_partial_json(json!({ "doctor_id": "d1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(doc_json("shift-1", 1, json!({ "doctor_id": "d1" }))),
        )
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let doc = store
        .insert("work_shifts", json!({ "doctor_id": "d1" }))
        .await
        .unwrap();

    assert_eq!(doc.id, "shift-1");
}

#[tokio::test]
async fn commit_conflict_maps_to_contention() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commit"))
        .respond_with(ResponseTemplate::new(409).set_body_string("precondition failed"))
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let batch = WriteBatch::new()
        .require_revision("time_slots", "slot-1", 1)
        .update("time_slots", "slot-1", json!({ "booked": true }));

    let result = store.commit(batch).await;
    assert_matches!(result, Err(StoreError::Contention));
}

#[tokio::test]
async fn backend_failure_is_reported_as_backend_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reservations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let store = RestStore::new(&test_config(&mock_server.uri()));
    let result = store.query("reservations", &[]).await;

    assert_matches!(result, Err(StoreError::Backend(_)));
}
