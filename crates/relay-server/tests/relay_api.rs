use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chat_common::channels::{ADMIN_CHANNEL, PUBLIC_CHAT_CHANNEL, RELAY_EVENT};
use chat_common::{FrameDecoder, RelayPayload};
use http_body_util::BodyExt;
use relay_server::pubsub::{PublishError, Publisher};
use relay_server::{app, AppState, RelayConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TOKEN: &str = "test-channel-token";

fn state() -> AppState {
    AppState::new(RelayConfig::default().with_channel_token(TOKEN)).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _: &str, _: &str, _: Value) -> Result<usize, PublishError> {
        Err(PublishError::Transport("connection refused".into()))
    }
}

#[tokio::test]
async fn relay_publishes_one_message_event_on_chat() {
    let state = state();
    let mut rx = state.hub.subscribe(PUBLIC_CHAT_CHANNEL);

    let resp = app(state.clone())
        .oneshot(post_json(
            "/api/messages",
            json!({ "fromUser": "u1", "toUser": "u2", "message": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "success": true }));

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.event, RELAY_EVENT);
    assert_eq!(frame.channel, PUBLIC_CHAT_CHANNEL);
    let payload: RelayPayload = serde_json::from_slice(&frame.data).unwrap();
    assert_eq!(payload.from_user, "u1");
    assert_eq!(payload.to_user, "u2");
    assert_eq!(payload.message, "hi");
    assert!(!payload.time.is_empty());

    assert!(rx.try_recv().is_err(), "exactly one event expected");
}

#[tokio::test]
async fn relay_passes_numeric_ids_through() {
    let state = state();
    let mut rx = state.hub.subscribe(PUBLIC_CHAT_CHANNEL);

    let resp = app(state.clone())
        .oneshot(post_json(
            "/api/messages",
            json!({ "fromUser": 1, "toUser": 2, "message": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let frame = rx.recv().await.unwrap();
    let payload: Value = serde_json::from_slice(&frame.data).unwrap();
    assert_eq!(payload["fromUser"], 1);
    assert_eq!(payload["toUser"], 2);
    assert_eq!(payload["message"], "hi");
}

#[tokio::test]
async fn relay_rejects_missing_fields() {
    let resp = app(state())
        .oneshot(post_json(
            "/api/messages",
            json!({ "fromUser": "u1", "message": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn relay_reports_publish_failure_as_500() {
    let state = AppState::with_publisher(RelayConfig::default(), Arc::new(FailingPublisher));

    let resp = app(state)
        .oneshot(post_json(
            "/api/messages",
            json!({ "fromUser": "u1", "toUser": "u2", "message": "hi" }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Failed to send message" })
    );
}

#[tokio::test]
async fn private_channel_requires_token() {
    let req = Request::builder()
        .uri(format!("/channels/{}/subscribe", ADMIN_CHANNEL))
        .body(Body::empty())
        .unwrap();

    let resp = app(state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trigger_requires_token() {
    let resp = app(state())
        .oneshot(post_json(
            &format!("/api/channels/{}/events", ADMIN_CHANNEL),
            json!({ "event": "user.online", "data": { "userId": "7" } }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscriber_receives_triggered_event() {
    let state = state();

    let subscribe = Request::builder()
        .uri(format!("/channels/{}/subscribe", ADMIN_CHANNEL))
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let resp = app(state.clone()).oneshot(subscribe).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let trigger = Request::builder()
        .method("POST")
        .uri(format!("/api/channels/{}/events", ADMIN_CHANNEL))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::from(
            json!({ "event": "user.online", "data": { "userId": "7" } }).to_string(),
        ))
        .unwrap();
    let triggered = app(state.clone()).oneshot(trigger).await.unwrap();
    assert_eq!(triggered.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(triggered).await["subscribers"], 1);

    let mut body = resp.into_body();
    let mut decoder = FrameDecoder::new();
    let frame = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let chunk = body.frame().await.unwrap().unwrap();
            if let Ok(data) = chunk.into_data() {
                if let Some(frame) = decoder.feed(&data).unwrap().into_iter().next() {
                    return frame;
                }
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(frame.event, "user.online");
    assert_eq!(frame.channel, ADMIN_CHANNEL);
    assert_eq!(&frame.data[..], br#"{"userId":"7"}"#);
}

#[tokio::test]
async fn dropped_subscriptions_leave_no_channels_behind() {
    let state = state();

    for i in 0..20 {
        let req = Request::builder()
            .uri(format!("/channels/junk{}/subscribe", i))
            .body(Body::empty())
            .unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.hub.channel_count(), 1);
        drop(resp);
    }

    assert_eq!(state.hub.channel_count(), 0);
}

#[tokio::test]
async fn health_check_answers() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app(state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
