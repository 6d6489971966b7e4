use chat_client::channel::{ChannelTransport, HttpChannelTransport};
use chat_client::{ClientError, ConnectionState, RealtimeChannel};
use chat_common::channels::{ADMIN_CHANNEL, USER_ONLINE_EVENT};
use chat_common::AdminEvent;
use futures::StreamExt;
use relay_server::{app, AppState, RelayConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TOKEN: &str = "admin-token";

/// Serve the relay on an ephemeral port and return its base URL.
async fn spawn_relay() -> String {
    let state = AppState::new(RelayConfig::default().with_channel_token(TOKEN)).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn trigger(base: &str, event: &str, data: serde_json::Value) -> u64 {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/channels/{}/events", base, ADMIN_CHANNEL))
        .bearer_auth(TOKEN)
        .json(&json!({ "event": event, "data": data }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 202);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["subscribers"].as_u64().unwrap()
}

#[tokio::test]
async fn decodes_frames_from_the_relay() {
    let base = spawn_relay().await;
    let transport = HttpChannelTransport::new(base.clone()).unwrap();

    let mut frames = transport.connect(ADMIN_CHANNEL, TOKEN).await.unwrap();
    assert_eq!(trigger(&base, USER_ONLINE_EVENT, json!({ "userId": "7" })).await, 1);

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(frame.event, USER_ONLINE_EVENT);
    assert_eq!(frame.channel, ADMIN_CHANNEL);
    assert_eq!(&frame.data[..], br#"{"userId":"7"}"#);
}

#[tokio::test]
async fn wrong_token_is_refused_with_status() {
    let base = spawn_relay().await;
    let transport = HttpChannelTransport::new(base).unwrap();

    let err = match transport.connect(ADMIN_CHANNEL, "wrong").await {
        Ok(_) => panic!("subscription should be refused"),
        Err(e) => e,
    };
    assert!(matches!(err, ClientError::Status(401)), "{:?}", err);
}

#[tokio::test]
async fn realtime_channel_receives_presence_over_http() {
    let base = spawn_relay().await;
    let transport = Arc::new(HttpChannelTransport::new(base.clone()).unwrap());
    let mut channel = RealtimeChannel::new(transport, ADMIN_CHANNEL, TOKEN);
    let mut events = channel.open().unwrap();

    let mut state = channel.watch_state();
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
    trigger(&base, USER_ONLINE_EVENT, json!({ "userId": "42" })).await;

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap();
    assert_eq!(event, Some(AdminEvent::UserOnline("42".into())));

    assert!(channel.close().await);
}
