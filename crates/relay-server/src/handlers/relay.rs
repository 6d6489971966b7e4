//! Message relay endpoint
//!
//! Republishes a chat message onto the public `chat` channel. Fire and
//! forget: no retry, no idempotency key, success means the publish call
//! itself succeeded.

use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chat_common::channels::{PUBLIC_CHAT_CHANNEL, RELAY_EVENT};
use chat_common::RelayPayload;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub from_user: Option<Value>,
    #[serde(default)]
    pub to_user: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

const MISSING_FIELDS: &str = "fromUser, toUser and message are required";

/// POST /api/messages
pub async fn relay_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload.map_err(|e| {
        warn!("POST /api/messages - rejected body: {}", e);
        Error::BadRequest(MISSING_FIELDS.to_string())
    })?;

    let (Some(from_user), Some(to_user), Some(message)) =
        (present(req.from_user), present(req.to_user), present(req.message))
    else {
        warn!("POST /api/messages - missing fields");
        return Err(Error::BadRequest(MISSING_FIELDS.to_string()));
    };

    info!("POST /api/messages - {} -> {}", from_user, to_user);

    let payload = RelayPayload {
        from_user,
        to_user,
        message,
        time: time_of_day(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| Error::Internal(e.to_string()))?;

    match state
        .publisher
        .publish(PUBLIC_CHAT_CHANNEL, RELAY_EVENT, data)
        .await
    {
        Ok(delivered) => {
            info!(
                "Relayed message on {} to {} subscribers",
                PUBLIC_CHAT_CHANNEL, delivered
            );
            Ok(Json(json!({ "success": true })))
        }
        Err(e) => {
            error!("Failed to publish relay message: {}", e);
            Err(Error::PublishFailed)
        }
    }
}

/// Any value counts except `null` and the empty string.
fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null() && v.as_str() != Some(""))
}

/// Server local time of day, e.g. `3:04:05 PM`.
fn time_of_day() -> String {
    chrono::Local::now().format("%-I:%M:%S %p").to_string()
}
