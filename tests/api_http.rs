// tests/api_http.rs
//
// HTTP-level tests for the query Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /alerts       (empty board, populated board)
// - GET /alerts.json
// - GET /metrics      (no recorder installed)

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use weatherboy::api::{self, ApiState, NO_ACTIVE_ALERTS};
use weatherboy::ingest::cache::ActiveAlert;
use weatherboy::ingest::scheduler::{alert_board, AlertBoard};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> (Router, AlertBoard) {
    let (board, rx) = alert_board();
    let app = api::router(ApiState {
        alerts: rx,
        metrics: None,
    });
    (app, board)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, String::from_utf8(bytes).expect("utf8"))
}

fn sample_alerts() -> Vec<ActiveAlert> {
    vec![
        ActiveAlert {
            id: "urn:oid:a".into(),
            point: "Marion, IL".into(),
            event: "Flood Watch".into(),
            tier: "Flood Watch",
            text: "🌊 FLOOD WATCH for Marion, IL 🌊\nFlood Watch until noon (Alert)".into(),
            expires: Utc.with_ymd_and_hms(2025, 4, 3, 0, 0, 0).unwrap(),
        },
        ActiveAlert {
            id: "urn:oid:b".into(),
            point: "Murray, KY".into(),
            event: "Dense Fog Advisory".into(),
            tier: "Dense Fog Advisory",
            text: "🌫️ DENSE FOG ADVISORY for Murray, KY 🌫️\nFog until 9 AM (Alert)".into(),
            expires: Utc.with_ymd_and_hms(2025, 4, 3, 6, 0, 0).unwrap(),
        },
    ]
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (app, _board) = test_router();
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn alerts_without_any_active_reports_placeholder() {
    let (app, _board) = test_router();
    let (status, body) = get(app, "/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, NO_ACTIVE_ALERTS);
}

#[tokio::test]
async fn alerts_lists_latest_snapshot_texts_in_order() {
    let (app, board) = test_router();
    board.send_replace(sample_alerts());

    let (status, body) = get(app, "/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("FLOOD WATCH for Marion, IL"));
    assert!(lines[2].contains("DENSE FOG ADVISORY for Murray, KY"));
}

#[tokio::test]
async fn alerts_json_exposes_structured_snapshot() {
    let (app, board) = test_router();
    board.send_replace(sample_alerts());

    let (status, body) = get(app, "/alerts.json").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_str(&body).expect("json body");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "urn:oid:a");
    assert_eq!(arr[0]["point"], "Marion, IL");
    assert_eq!(arr[0]["tier"], "Flood Watch");
    assert_eq!(arr[1]["event"], "Dense Fog Advisory");
    assert!(arr[1]["expires"].as_str().unwrap().starts_with("2025-04-03T06:00:00"));
}

#[tokio::test]
async fn snapshot_updates_are_visible_to_later_requests() {
    let (app, board) = test_router();
    board.send_replace(sample_alerts());
    let (_, before) = get(app.clone(), "/alerts").await;
    assert_ne!(before, NO_ACTIVE_ALERTS);

    board.send_replace(vec![]);
    let (_, after) = get(app, "/alerts").await;
    assert_eq!(after, NO_ACTIVE_ALERTS);
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let (app, _board) = test_router();
    let (status, _) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
