//! Integration tests for the HTTP API
//!
//! Drives the router with tower's `oneshot`; cloned routers share one registry.

use std::sync::Arc;

use attunement::core::{create_router, router_with_registry, EngineConfig, EntropyCombiner, SessionRegistry};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn new_session(app: &Router, body: &str) -> String {
    let (status, json) = send(app, "POST", "/session/new", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router();
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions_total"], 0);
    assert_eq!(json["analysis_window"], attunement::ANALYSIS_WINDOW);
    assert_eq!(json["history_capacity"], attunement::HISTORY_CAPACITY);
}

#[tokio::test]
async fn test_health_reports_registry_config() {
    let config = EngineConfig::default().with_window(12).with_history_capacity(50);
    let app = router_with_registry(Arc::new(SessionRegistry::with_config(config).unwrap()));
    let (_, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(json["analysis_window"], 12);
    assert_eq!(json["history_capacity"], 50);
}

#[tokio::test]
async fn test_reading_requires_post() {
    let app = create_router();
    let id = new_session(&app, r#"{"baseline_tone_arm": 3.0, "sensitivity": 1.0}"#).await;

    let (status, _) = send(&app, "GET", &format!("/session/{}/reading", id), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (_, summary) = send(&app, "GET", &format!("/session/{}/summary", id), None).await;
    assert_eq!(summary["total_readings"], 0);

    let (status, reading) = send(&app, "POST", &format!("/session/{}/reading", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reading["sequence"], 1);
}

#[tokio::test]
async fn test_create_session() {
    let app = create_router();
    let (status, json) = send(
        &app,
        "POST",
        "/session/new",
        Some(r#"{"baseline_tone_arm": 2.5, "sensitivity": 0.8}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = json["session_id"].as_str().unwrap();
    assert_eq!(json["websocket_url"], format!("/ws/{}", id));
}

#[tokio::test]
async fn test_create_session_defaults() {
    let app = create_router();
    let id = new_session(&app, "{}").await;

    let (status, json) = send(&app, "GET", &format!("/session/{}/summary", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["baseline_tone_arm"], attunement::DEFAULT_BASELINE_TONE_ARM);
    assert_eq!(json["sensitivity"], attunement::DEFAULT_SENSITIVITY);
}

#[tokio::test]
async fn test_create_session_rejects_bad_sensitivity() {
    let app = create_router();
    let (status, json) = send(&app, "POST", "/session/new", Some(r#"{"sensitivity": 0}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_session_not_found() {
    let app = create_router();

    for (method, uri) in [
        ("POST", "/session/nonexistent/reading"),
        ("GET", "/session/nonexistent/summary"),
        ("GET", "/session/nonexistent/history"),
        ("POST", "/session/nonexistent/stop"),
        ("DELETE", "/session/nonexistent"),
    ] {
        let (status, json) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(json["code"], "SESSION_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_websocket_unknown_session() {
    let app = create_router();
    let (status, _) = send(&app, "GET", "/ws/nonexistent", None).await;
    // Non-upgrade requests are rejected before the session lookup matters
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = create_router();
    let id = new_session(&app, r#"{"baseline_tone_arm": 4.0, "sensitivity": 1.0}"#).await;

    for expected in 1..=5u64 {
        let (status, reading) = send(&app, "POST", &format!("/session/{}/reading", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reading["sequence"], expected);
        assert!(reading["needle_state"].is_string());
        assert!(reading["quality"].is_string());
        let score = reading["floating_needle_score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    let (_, history) = send(&app, "GET", &format!("/session/{}/history?limit=3", id), None).await;
    let readings = history["readings"].as_array().unwrap();
    assert_eq!(readings.len(), 3);
    assert_eq!(readings[0]["sequence"], 3);
    assert_eq!(readings[2]["sequence"], 5);

    let (_, list) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(list["sessions"][0]["session_id"], id.as_str());
    assert_eq!(list["sessions"][0]["active"], true);

    let (status, stopped) = send(&app, "POST", &format!("/session/{}/stop", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["active"], false);
    assert_eq!(stopped["total_readings"], 5);

    let (status, json) = send(&app, "POST", &format!("/session/{}/stop", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_STOPPED");

    let (status, json) = send(&app, "POST", &format!("/session/{}/reading", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "SESSION_INACTIVE");

    let (status, summary) = send(&app, "GET", &format!("/session/{}/summary", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, stopped);

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions_total"], 1);
    assert_eq!(health["sessions_active"], 0);

    let (status, _) = send(&app, "DELETE", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/session/{}/summary", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_floating_through_api() {
    let registry = SessionRegistry::with_combiner_factory(EngineConfig::default(), || {
        EntropyCombiner::fixed(0.5)
    })
    .unwrap();
    let app = router_with_registry(Arc::new(registry));
    let id = new_session(&app, r#"{"baseline_tone_arm": 3.0, "sensitivity": 1.0}"#).await;

    let mut readings = Vec::new();
    for _ in 0..10 {
        readings.push(send(&app, "POST", &format!("/session/{}/reading", id), None).await.1);
    }
    let last = readings.last().unwrap();
    assert_eq!(last["needle_state"], "FLOATING");
    assert_eq!(last["quality"], "EXCELLENT");

    let (_, summary) = send(&app, "GET", &format!("/session/{}/summary", id), None).await;
    assert_eq!(summary["floating_count"], 8);
    assert_eq!(summary["state_counts"]["FLOATING"], 8);
}
