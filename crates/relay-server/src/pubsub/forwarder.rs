//! Forwarding publisher for an external pub/sub provider
//!
//! Each publish is POSTed as `{channel, event, data}` to the configured
//! URL. Once the provider accepts it, the event is mirrored into the local
//! hub so in-process subscribers still see it.

use super::{ChannelHub, PublishError, Publisher};
use async_trait::async_trait;
use chat_common::Frame;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct HttpForwarder {
    client: reqwest::Client,
    url: String,
    key: Option<String>,
    hub: Arc<ChannelHub>,
}

impl HttpForwarder {
    pub fn new(url: String, key: Option<String>, hub: Arc<ChannelHub>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create pub/sub HTTP client: {}", e))?;
        Ok(Self {
            client,
            url,
            key,
            hub,
        })
    }
}

#[async_trait]
impl Publisher for HttpForwarder {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        data: serde_json::Value,
    ) -> Result<usize, PublishError> {
        let body = json!({
            "channel": channel,
            "event": event,
            "data": data,
        });

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.key {
            req = req.bearer_auth(key);
        }

        debug!("[Forwarder] POST {} {} on {}", self.url, event, channel);

        let resp = req
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("[Forwarder] Provider returned {} for {}", status, event);
            return Err(PublishError::Rejected(status.as_u16()));
        }

        let payload = serde_json::to_vec(&data)?;
        Ok(self.hub.broadcast(Frame::new(event, channel, payload)))
    }
}
