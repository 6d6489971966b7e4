//! Chat data contracts
//!
//! Backend payloads are decoded through lenient "raw" shapes where every
//! field is optional. Ids may arrive as JSON numbers or strings, timestamps
//! as RFC 3339 or `YYYY-MM-DD HH:MM:SS`. A record without an id is rejected;
//! any other missing field falls back to a default.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Marks a message as sent by a support agent in channel payloads.
pub const RESPONSE_TYPE: &str = "response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Customer to support.
    #[default]
    Inbound,
    /// Support agent to customer.
    Outbound,
}

impl Direction {
    /// `type: "response"` marks an agent-originated message, anything else is inbound.
    pub fn from_type(kind: Option<&str>) -> Self {
        match kind {
            Some(RESPONSE_TYPE) => Direction::Outbound,
            _ => Direction::Inbound,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawMessage")]
pub struct Message {
    pub id: String,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub direction: Direction,
}

impl Message {
    /// The customer on the other side of the conversation.
    pub fn counterpart_id(&self) -> Option<&str> {
        match self.direction {
            Direction::Inbound => self.from_user_id.as_deref(),
            Direction::Outbound => self.to_user_id.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMessage {
    #[serde(deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(
        alias = "from_user_id",
        alias = "fromUser",
        alias = "sender_id",
        deserialize_with = "lenient_id"
    )]
    from_user_id: Option<String>,
    #[serde(
        alias = "to_user_id",
        alias = "toUser",
        alias = "receiver_id",
        deserialize_with = "lenient_id"
    )]
    to_user_id: Option<String>,
    #[serde(alias = "message", alias = "content")]
    body: Option<String>,
    #[serde(alias = "created_at", deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    kind: Option<String>,
    direction: Option<Direction>,
}

impl TryFrom<RawMessage> for Message {
    type Error = String;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or_else(|| "message without id".to_string())?;
        let direction = raw
            .direction
            .unwrap_or_else(|| Direction::from_type(raw.kind.as_deref()));
        Ok(Message {
            id,
            from_user_id: raw.from_user_id,
            to_user_id: raw.to_user_id,
            body: raw.body.unwrap_or_default(),
            created_at: raw.created_at.unwrap_or_else(Utc::now),
            direction,
        })
    }
}

/// A customer in the support list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawUser")]
pub struct User {
    pub id: String,
    pub name: String,
    pub last_message: Option<Message>,
    pub unread_count: u32,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_message: None,
            unread_count: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawUser {
    #[serde(deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(alias = "username")]
    name: Option<String>,
    #[serde(alias = "last_message")]
    last_message: Option<Value>,
    #[serde(alias = "unread_count", alias = "unread")]
    unread_count: Option<Value>,
}

impl TryFrom<RawUser> for User {
    type Error = String;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or_else(|| "user without id".to_string())?;
        // A broken preview message must not drop the whole user.
        let last_message = raw
            .last_message
            .and_then(|v| serde_json::from_value::<Message>(v).ok());
        let unread_count = raw
            .unread_count
            .and_then(|v| v.as_u64())
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0);
        Ok(User {
            id,
            name: raw.name.unwrap_or_default(),
            last_message,
            unread_count,
        })
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(s)) = value else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc()))
}
