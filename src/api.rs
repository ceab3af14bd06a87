//! Read-only query surface: health, active alerts, metrics.
//!
//! Handlers read the latest snapshot published by the poller; they never
//! touch the dedup cache.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::ingest::cache::ActiveAlert;

pub const NO_ACTIVE_ALERTS: &str = "No active alerts";

#[derive(Clone)]
pub struct ApiState {
    pub alerts: watch::Receiver<Vec<ActiveAlert>>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/alerts", get(alerts_text))
        .route("/alerts.json", get(alerts_json))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rendered alert texts, one per line, the way they were announced.
pub fn render_alert_list(alerts: &[ActiveAlert]) -> String {
    if alerts.is_empty() {
        return NO_ACTIVE_ALERTS.to_string();
    }
    alerts
        .iter()
        .map(|a| a.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn alerts_text(State(state): State<ApiState>) -> String {
    render_alert_list(&state.alerts.borrow())
}

async fn alerts_json(State(state): State<ApiState>) -> Json<Vec<ActiveAlert>> {
    Json(state.alerts.borrow().clone())
}

async fn metrics(State(state): State<ApiState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
