//! Support REST API client
//!
//! The listings backend owns users and conversation history; this module
//! only consumes it. Responses are decoded through envelope structs whose
//! fields are all optional, and list entries that do not match the contract
//! are dropped one by one instead of failing the whole response.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chat_common::{Message, User};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const SUCCESS: &str = "success";

#[async_trait]
pub trait SupportApi: Send + Sync {
    /// GET /api/support/users
    async fn fetch_users(&self) -> Result<Vec<User>>;
    /// GET /api/messages/{userId}
    async fn fetch_conversation(&self, user_id: &str) -> Result<Vec<Message>>;
    /// POST /api/messages/send
    async fn send_message(&self, user_id: &str, body: &str) -> Result<Message>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsersEnvelope {
    status: Option<String>,
    users: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagesEnvelope {
    status: Option<String>,
    messages: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SentEnvelope {
    status: Option<String>,
    message: Option<Value>,
}

pub struct HttpSupportApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpSupportApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        // No request timeout: calls wait until the transport gives up.
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = join_url(&self.config.api_base, segments)?;
        debug!("[SupportApi] GET {}", url);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        decode_response(resp).await
    }
}

#[async_trait]
impl SupportApi for HttpSupportApi {
    async fn fetch_users(&self) -> Result<Vec<User>> {
        let envelope: UsersEnvelope = self.get_json(&["api", "support", "users"]).await?;
        if !is_success(envelope.status.as_deref()) {
            warn!("[SupportApi] users status {:?}, using empty list", envelope.status);
            return Ok(Vec::new());
        }
        let users = decode_list::<User>(envelope.users, "user");
        info!("[SupportApi] Loaded {} users", users.len());
        Ok(users)
    }

    async fn fetch_conversation(&self, user_id: &str) -> Result<Vec<Message>> {
        let envelope: MessagesEnvelope = self.get_json(&["api", "messages", user_id]).await?;
        if !is_success(envelope.status.as_deref()) {
            warn!("[SupportApi] conversation status {:?}, using empty list", envelope.status);
            return Ok(Vec::new());
        }
        Ok(decode_list::<Message>(envelope.messages, "message"))
    }

    async fn send_message(&self, user_id: &str, body: &str) -> Result<Message> {
        let url = join_url(&self.config.api_base, &["api", "messages", "send"])?;
        debug!("[SupportApi] POST {} to {}", url, user_id);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.token)
            .json(&json!({ "userId": user_id, "message": body }))
            .send()
            .await?;

        let envelope: SentEnvelope = decode_response(resp).await?;
        if !is_success(envelope.status.as_deref()) {
            return Err(ClientError::Decode(format!(
                "send status {:?}",
                envelope.status
            )));
        }
        let message = envelope
            .message
            .ok_or_else(|| ClientError::Decode("send response without message".to_string()))?;
        serde_json::from_value(message).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

async fn decode_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// A missing status is tolerated, an explicit non-success one is not.
fn is_success(status: Option<&str>) -> bool {
    status.map_or(true, |s| s == SUCCESS)
}

fn decode_list<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("[SupportApi] Dropping malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

/// Append percent-encoded path segments to a base URL.
pub(crate) fn join_url(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
