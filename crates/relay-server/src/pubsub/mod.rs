//! Pub/sub layer
//!
//! Publishing goes through the [`Publisher`] trait so the relay endpoint
//! does not care whether events land in the in-process [`ChannelHub`] or
//! are forwarded to an external provider.

pub mod forwarder;
pub mod hub;

pub use forwarder::HttpForwarder;
pub use hub::{ChannelHub, Subscription};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("pub/sub transport error: {0}")]
    Transport(String),
    #[error("pub/sub provider rejected the event with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Publish `data` as `event` on `channel`, returning how many local
    /// subscribers received it.
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        data: serde_json::Value,
    ) -> Result<usize, PublishError>;
}
