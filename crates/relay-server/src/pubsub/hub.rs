//! In-process channel hub
//!
//! One tokio broadcast channel per named channel, created lazily on the
//! first subscribe and removed once its last [`Subscription`] is dropped.

use super::{PublishError, Publisher};
use async_trait::async_trait;
use chat_common::Frame;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::debug;

pub struct ChannelHub {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<Frame>>>,
}

/// A receiver on one hub channel. Dropping it releases the channel entry
/// when no other subscriber is left.
pub struct Subscription {
    hub: Arc<ChannelHub>,
    channel: String,
    rx: Option<broadcast::Receiver<Frame>>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn recv(&mut self) -> Result<Frame, RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(RecvError::Closed),
        }
    }

    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.try_recv(),
            None => Err(TryRecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The receiver must be gone before the count is checked.
        drop(self.rx.take());
        self.hub.release(&self.channel);
    }
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a channel, creating it if needed.
    pub fn subscribe(self: &Arc<Self>, channel: &str) -> Subscription {
        let rx = self
            .channels
            .write()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        Subscription {
            hub: self.clone(),
            channel: channel.to_string(),
            rx: Some(rx),
        }
    }

    /// Remove `channel` if nobody listens on it anymore.
    pub fn release(&self, channel: &str) {
        let mut channels = self.channels.write();
        if channels
            .get(channel)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(channel);
            debug!("[Hub] Released idle channel {}", channel);
        }
    }

    /// Send a frame to the channel's current subscribers.
    pub fn broadcast(&self, frame: Frame) -> usize {
        let channels = self.channels.read();
        let Some(tx) = channels.get(&frame.channel) else {
            debug!("[Hub] No subscribers on {} for {}", frame.channel, frame.event);
            return 0;
        };
        // A send error only means every receiver is gone.
        tx.send(frame).unwrap_or(0)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }
}

#[async_trait]
impl Publisher for ChannelHub {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        data: serde_json::Value,
    ) -> Result<usize, PublishError> {
        let body = serde_json::to_vec(&data)?;
        let delivered = self.broadcast(Frame::new(event, channel, body));
        debug!("[Hub] {} on {} delivered to {}", event, channel, delivered);
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hub() -> Arc<ChannelHub> {
        Arc::new(ChannelHub::new(8))
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hub = hub();
        let mut a = hub.subscribe("chat");
        let mut b = hub.subscribe("chat");

        let delivered = hub.publish("chat", "message", json!({"x": 1})).await.unwrap();
        assert_eq!(delivered, 2);

        for sub in [&mut a, &mut b] {
            let frame = sub.recv().await.unwrap();
            assert_eq!(frame.event, "message");
            assert_eq!(frame.channel, "chat");
            assert_eq!(&frame.data[..], br#"{"x":1}"#);
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let hub = hub();
        let delivered = hub.publish("chat", "message", json!({})).await.unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn channel_is_released_with_its_last_subscriber() {
        let hub = hub();
        let first = hub.subscribe("admin.chat");
        let second = hub.subscribe("admin.chat");
        assert_eq!(hub.subscriber_count("admin.chat"), 2);

        drop(first);
        assert_eq!(hub.channel_count(), 1);
        drop(second);
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn abandoned_channels_do_not_accumulate() {
        let hub = hub();
        for i in 0..50 {
            let sub = hub.subscribe(&format!("junk{}", i));
            assert_eq!(sub.channel(), format!("junk{}", i));
        }
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let hub = hub();
        let mut admin = hub.subscribe("admin.chat");
        hub.publish("chat", "message", json!({})).await.unwrap();
        assert!(admin.try_recv().is_err());
    }
}
