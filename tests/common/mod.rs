// tests/common/mod.rs
//
// In-process HTTP stand-ins for the alerts feed and the chat API.

#![allow(dead_code)]

use axum::Router;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral localhost port; returns `http://127.0.0.1:<port>`.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}

/// A port nothing listens on.
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn alert_json(id: &str, event: &str, headline: &str) -> serde_json::Value {
    serde_json::json!({
        "@id": format!("https://api.weather.gov/alerts/{id}"),
        "id": id,
        "event": event,
        "headline": headline,
        "description": "Details follow.",
        "expires": "2099-01-01T00:00:00-06:00",
        "messageType": "Alert",
        "tags": []
    })
}
