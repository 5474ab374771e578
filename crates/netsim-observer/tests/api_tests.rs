//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test builds a fresh session from the
//! default configuration.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::TimeDelta;
use netsim_core::{Session, SimulationConfig};
use netsim_observer::router::build_router;
use netsim_observer::state::AppState;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

fn make_app() -> (Router, Arc<AppState>) {
    let session = Session::new(SimulationConfig::default()).unwrap();
    let state = Arc::new(AppState::new(session));
    (build_router(Arc::clone(&state)), state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

/// A visible mission with no prerequisite.
async fn standalone_mission_id(router: &Router) -> String {
    let (_, body) = get(router, "/api/missions").await;
    body["missions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|mission| mission["requires_completed_mission"].is_null())
        .map(|mission| mission["id"].as_str().unwrap().to_owned())
        .unwrap()
}

// =========================================================================
// Read endpoints
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let (router, _) = make_app();

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_state_reports_a_fresh_session() {
    let (router, _) = make_app();

    let (status, json) = get(&router, "/api/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "operator");
    assert_eq!(json["speed"], 1);
    assert_eq!(json["paused"], false);
    assert_eq!(decimal(&json["balance"]), Decimal::from(1000));
    assert!(json["active_mission"].is_null());
    assert!(json["game_over"].is_null());
    assert!(json["missions_offered"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_networks_include_connected_home() {
    let (router, _) = make_app();

    let (status, json) = get(&router, "/api/networks").await;

    assert_eq!(status, StatusCode::OK);
    let home = json["networks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|network| network["network_id"] == "home")
        .unwrap();
    assert_eq!(home["connected"], true);
    assert_eq!(home["device_count"], 1);
}

#[tokio::test]
async fn test_get_network_lists_devices() {
    let (router, _) = make_app();

    let (status, json) = get(&router, "/api/networks/home").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["devices"][0]["ip"], "192.168.1.10");
}

#[tokio::test]
async fn test_get_network_not_found() {
    let (router, _) = make_app();

    let (status, json) = get(&router, "/api/networks/nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_get_device_includes_file_system() {
    let (router, _) = make_app();

    let (status, json) = get(&router, "/api/devices/192.168.1.10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["device"]["hostname"], "workstation");
    assert_eq!(json["file_system"]["id"], "home-fs");
}

#[tokio::test]
async fn test_active_mission_is_not_found_before_accepting() {
    let (router, _) = make_app();

    let (status, _) = get(&router, "/api/missions/active").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inbox_delivers_welcome_after_the_gap() {
    let (router, state) = make_app();

    let (_, before) = get(&router, "/api/inbox").await;
    assert_eq!(before["count"], 0);
    assert_eq!(before["queued"], 1);

    state
        .session
        .lock()
        .await
        .advance_virtual(TimeDelta::seconds(10))
        .unwrap();

    let (_, after) = get(&router, "/api/inbox").await;
    assert_eq!(after["count"], 1);
    assert_eq!(after["unread"], 1);

    let id = after["messages"][0]["id"].as_str().unwrap().to_owned();
    let (status, _) = post(&router, &format!("/api/inbox/{id}/read"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, read) = get(&router, "/api/inbox").await;
    assert_eq!(read["unread"], 0);
}

#[tokio::test]
async fn test_events_respect_limit() {
    let (router, _) = make_app();
    post(&router, "/api/clock/pause", json!({})).await;
    post(&router, "/api/clock/resume", json!({})).await;

    let (status, json) = get(&router, "/api/events?limit=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
}

// =========================================================================
// Missions
// =========================================================================

#[tokio::test]
async fn test_accept_mission_makes_it_active() {
    let (router, _) = make_app();
    let id = standalone_mission_id(&router).await;

    let (status, accepted) = post(&router, &format!("/api/missions/{id}/accept"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["mission"]["id"], id.as_str());

    let (_, active) = get(&router, "/api/missions/active").await;
    assert_eq!(active["mission"]["id"], id.as_str());

    let (_, missions) = get(&router, "/api/missions").await;
    assert!(
        missions["missions"]
            .as_array()
            .unwrap()
            .iter()
            .all(|mission| mission["id"] != id.as_str())
    );
}

#[tokio::test]
async fn test_accepting_twice_is_a_conflict() {
    let (router, _) = make_app();
    let id = standalone_mission_id(&router).await;
    post(&router, &format!("/api/missions/{id}/accept"), json!({})).await;

    let (status, json) = post(&router, &format!("/api/missions/{id}/accept"), json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_accept_rejects_bad_ids() {
    let (router, _) = make_app();

    let (status, _) = post(&router, "/api/missions/not-a-uuid/accept", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = "00000000-0000-7000-8000-000000000000";
    let (status, _) = post(&router, &format!("/api/missions/{unknown}/accept"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_abandon_without_active_mission_is_a_conflict() {
    let (router, _) = make_app();

    let (status, _) = post(&router, "/api/missions/active/abandon", json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_abandon_records_failure_in_history() {
    let (router, _) = make_app();
    let id = standalone_mission_id(&router).await;
    post(&router, &format!("/api/missions/{id}/accept"), json!({})).await;

    let (status, json) = post(&router, "/api/missions/active/abandon", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);

    let (_, history) = get(&router, "/api/missions/history").await;
    assert_eq!(history["missions"][0]["mission_id"], id.as_str());
}

// =========================================================================
// Operations
// =========================================================================

#[tokio::test]
async fn test_scan_operation_lifecycle() {
    let (router, _) = make_app();

    let (status, created) = post(
        &router,
        "/api/operations",
        json!({ "kind": "scan", "network_id": "home" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["estimated_secs"].as_f64().unwrap() > 0.0);
    let id = created["operation_id"].as_str().unwrap().to_owned();

    let (_, bandwidth) = get(&router, "/api/bandwidth").await;
    assert_eq!(bandwidth["operations"].as_array().unwrap().len(), 1);

    let (status, completed) =
        post(&router, &format!("/api/operations/{id}/complete"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["id"], id.as_str());

    let (_, bandwidth) = get(&router, "/api/bandwidth").await;
    assert!(bandwidth["operations"].as_array().unwrap().is_empty());

    let (status, _) = post(&router, &format!("/api/operations/{id}/complete"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_copy_without_destination_is_bad_request() {
    let (router, _) = make_app();

    let (status, _) = post(
        &router,
        "/api/operations",
        json!({
            "kind": "file",
            "operation": "copy",
            "file_system_id": "home-fs",
            "files": ["notes.txt"],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scanning_a_disconnected_network_is_rejected() {
    let (router, _) = make_app();
    let (status, _) = post(&router, "/api/networks/home/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &router,
        "/api/operations",
        json!({ "kind": "scan", "network_id": "home" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_investigation_needs_tooling() {
    let (router, _) = make_app();

    let (status, _) = post(&router, "/api/devices/192.168.1.10/investigate", json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// =========================================================================
// Bank and clock
// =========================================================================

#[tokio::test]
async fn test_deposit_updates_balance() {
    let (router, _) = make_app();

    let (status, json) = post(&router, "/api/bank/deposit", json!({ "amount": "500" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&json["balance"]), Decimal::from(1500));
}

#[tokio::test]
async fn test_deposit_rejects_negative_amounts() {
    let (router, _) = make_app();

    let (status, _) = post(&router, "/api/bank/deposit", json!({ "amount": "-5" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speed_must_be_allowed() {
    let (router, _) = make_app();

    let (status, _) = post(&router, "/api/clock/speed", json!({ "speed": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, state) = get(&router, "/api/state").await;
    assert_eq!(state["speed"], 5);

    let (status, _) = post(&router, "/api/clock/speed", json!({ "speed": 3 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pause_and_resume_report_changes() {
    let (router, _) = make_app();

    let (_, first) = post(&router, "/api/clock/pause", json!({})).await;
    let (_, second) = post(&router, "/api/clock/pause", json!({})).await;
    assert_eq!(first["ok"], true);
    assert_eq!(second["ok"], false);

    let (_, state) = get(&router, "/api/state").await;
    assert_eq!(state["paused"], true);

    let (_, resumed) = post(&router, "/api/clock/resume", json!({})).await;
    assert_eq!(resumed["ok"], true);
}
