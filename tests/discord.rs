// tests/discord.rs
//
// Discord notifier against an in-process stand-in for the REST API.

mod common;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use weatherboy::notify::discord::DiscordNotifier;
use weatherboy::notify::{Notification, Notifier};

#[derive(Debug, Clone)]
struct Posted {
    channel: u64,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct ChatApi {
    posted: Arc<Mutex<Vec<Posted>>>,
    reply: StatusCode,
}

async fn create_message(
    State(api): State<ChatApi>,
    Path(channel): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    api.posted.lock().unwrap().push(Posted {
        channel,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });
    (api.reply, Json(json!({ "id": "1" })))
}

async fn chat_api(reply: StatusCode) -> (ChatApi, String) {
    let api = ChatApi {
        posted: Arc::new(Mutex::new(vec![])),
        reply,
    };
    let app = Router::new()
        .route("/api/channels/{channel}/messages", post(create_message))
        .with_state(api.clone());
    let base = common::spawn_server(app).await;
    (api, format!("{base}/api"))
}

#[tokio::test]
async fn plain_notification_is_posted_with_bot_auth() {
    let (api, base) = chat_api(StatusCode::OK).await;
    let notifier = DiscordNotifier::new(1234, "s3cret".into()).with_api_base(base);

    notifier
        .send(&Notification::text("🌊 FLOOD WATCH for Marion, IL 🌊"))
        .await
        .expect("delivered");

    let posted = api.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel, 1234);
    assert_eq!(posted[0].authorization.as_deref(), Some("Bot s3cret"));
    assert_eq!(
        posted[0].body,
        json!({ "content": "🌊 FLOOD WATCH for Marion, IL 🌊" })
    );
}

#[tokio::test]
async fn embed_is_sent_alongside_text() {
    let (api, base) = chat_api(StatusCode::OK).await;
    let notifier = DiscordNotifier::new(7, "t".into()).with_api_base(base);

    let n = Notification::text("SPECIAL WEATHER STATEMENT for Murray, KY (Alert)")
        .with_embed("Special Weather Statement", "Strong winds expected.");
    notifier.send(&n).await.expect("delivered");

    let posted = api.posted.lock().unwrap().clone();
    let embeds = posted[0].body["embeds"].as_array().expect("embeds");
    assert_eq!(embeds.len(), 1);
    assert_eq!(embeds[0]["title"], "Special Weather Statement");
    assert_eq!(embeds[0]["description"], "Strong winds expected.");
}

#[tokio::test]
async fn rejected_post_is_an_error() {
    let (api, base) = chat_api(StatusCode::FORBIDDEN).await;
    let notifier = DiscordNotifier::new(7, "bad".into()).with_api_base(base);

    assert!(notifier.send(&Notification::text("hi")).await.is_err());
    assert_eq!(api.posted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_api_is_an_error() {
    let base = common::dead_address().await;
    let notifier = DiscordNotifier::new(7, "t".into()).with_api_base(base);
    assert!(notifier.send(&Notification::text("hi")).await.is_err());
}
