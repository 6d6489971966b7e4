//! Event payloads carried on channels

use crate::channels::{NEW_MESSAGE_EVENT, USER_OFFLINE_EVENT, USER_ONLINE_EVENT};
use crate::models::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of the relay `message` event on the public `chat` channel.
/// `fromUser`, `toUser` and `message` are relayed exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    pub from_user: Value,
    pub to_user: Value,
    pub message: Value,
    pub time: String,
}

/// Events pushed on the private admin channel
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    NewMessage(Message),
    UserOnline(String),
    UserOffline(String),
}

#[derive(Deserialize)]
struct NewMessageData {
    message: Message,
}

#[derive(Deserialize)]
struct PresenceData {
    #[serde(rename = "userId", alias = "user_id", alias = "id")]
    user_id: Value,
}

impl AdminEvent {
    /// Decode an admin channel event. Unknown events and payloads that do not
    /// match their contract yield `None`.
    pub fn decode(event: &str, data: &[u8]) -> Option<AdminEvent> {
        match event {
            NEW_MESSAGE_EVENT => serde_json::from_slice::<NewMessageData>(data)
                .ok()
                .map(|d| AdminEvent::NewMessage(d.message)),
            USER_ONLINE_EVENT => presence_user(data).map(AdminEvent::UserOnline),
            USER_OFFLINE_EVENT => presence_user(data).map(AdminEvent::UserOffline),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdminEvent::NewMessage(_) => NEW_MESSAGE_EVENT,
            AdminEvent::UserOnline(_) => USER_ONLINE_EVENT,
            AdminEvent::UserOffline(_) => USER_OFFLINE_EVENT,
        }
    }
}

fn presence_user(data: &[u8]) -> Option<String> {
    let parsed: PresenceData = serde_json::from_slice(data).ok()?;
    match parsed.user_id {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
