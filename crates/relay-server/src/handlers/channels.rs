//! Channel subscription stream and event trigger
//!
//! # Wire Format
//!
//! `GET /channels/{channel}/subscribe` answers with a long-lived body of
//! frames (see `chat_common::frame`), one per published event, plus a bare
//! `\r\n` every heartbeat interval:
//!
//! ```text
//! HTTP/1.1 200 OK
//! Content-Type: application/vnd.chat-frames
//! Heartbeats: 30s
//!
//! Event: message
//! Channel: chat
//! Content-Length: 71
//!
//! {"fromUser":"u1","toUser":"u2","message":"hi","time":"3:04:05 PM"}
//! ```

use crate::auth::check_channel_token;
use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use chat_common::channels;
use chat_common::frame::{FRAME_CONTENT_TYPE, HEARTBEAT};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// GET /channels/{channel}/subscribe
///
/// Private channels (`admin.*`, `private-*`) require the channel bearer token.
pub async fn subscribe(
    Path(channel): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    info!("[Subscribe] /channels/{}", channel);

    if !channels::is_valid_name(&channel) {
        return Err(Error::BadRequest(format!("Invalid channel name: {}", channel)));
    }

    if channels::is_private(&channel) {
        check_channel_token(&state.config, &headers).map_err(|e| {
            warn!("[Subscribe] Refused private channel {}: {}", channel, e);
            e
        })?;
    }

    let heartbeat = state.config.heartbeat_secs;
    let mut rx = state.hub.subscribe(&channel);

    info!("[Subscribe] Established for {}", channel);

    let stream = async_stream::stream! {
        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(heartbeat));

        loop {
            tokio::select! {
                update = rx.recv() => {
                    match update {
                        Ok(frame) => {
                            debug!("[Subscribe] {} -> {}", frame.event, frame.channel);
                            yield Ok::<_, Infallible>(frame.encode());
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("[Subscribe] {} lagged, skipped {} events", channel, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                _ = heartbeat_interval.tick() => {
                    yield Ok::<_, Infallible>(Bytes::from_static(HEARTBEAT));
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, FRAME_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header("Heartbeats", format!("{}s", heartbeat))
        .body(Body::from_stream(stream))
        .map_err(|e| {
            error!("[Subscribe] Failed to build response: {}", e);
            Error::Internal("Failed to open subscription".to_string())
        })
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// POST /api/channels/{channel}/events
///
/// Lets the backend push arbitrary events, e.g. `new.message` on `admin.chat`.
pub async fn trigger_event(
    Path(channel): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    info!("POST /api/channels/{}/events - {}", channel, req.event);

    if !channels::is_valid_name(&channel) {
        return Err(Error::BadRequest(format!("Invalid channel name: {}", channel)));
    }
    if req.event.trim().is_empty() {
        return Err(Error::BadRequest("event is required".to_string()));
    }

    let subscribers = state
        .publisher
        .publish(&channel, &req.event, req.data)
        .await
        .map_err(|e| {
            error!("Failed to publish {} on {}: {}", req.event, channel, e);
            Error::Internal("Failed to publish event".to_string())
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "subscribers": subscribers })),
    ))
}
