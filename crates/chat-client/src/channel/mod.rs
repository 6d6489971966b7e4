//! Realtime channel client
//!
//! [`RealtimeChannel`] owns one authenticated subscription to a private
//! channel. It is created explicitly with its transport and credential,
//! opened once, and closed once; there is no shared global connection.
//! Decoded [`AdminEvent`]s are handed to the owner over an mpsc channel and
//! the connection state is published on a watch channel. There is no
//! automatic reconnection.

pub mod http;
pub mod memory;

pub use http::HttpChannelTransport;
pub use memory::{MemoryFeed, MemoryTransport};

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chat_common::{AdminEvent, Frame};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type FrameStream = BoxStream<'static, Result<Frame>>;

/// Something that can open a frame stream for a channel.
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    async fn connect(&self, channel: &str, token: &str) -> Result<FrameStream>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    /// Human readable label for the conversation header.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Error => "Connection error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    closed: AtomicBool,
}

impl Shared {
    /// State changes after close are ignored; the check runs under the
    /// watch lock so it cannot interleave with `close`.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if self.closed.load(Ordering::Acquire) || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct RealtimeChannel {
    transport: Arc<dyn ChannelTransport>,
    channel: String,
    token: String,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
    opened: bool,
}

impl RealtimeChannel {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        channel: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            channel: channel.into(),
            token: token.into(),
            shared: Arc::new(Shared {
                state,
                closed: AtomicBool::new(false),
            }),
            task: None,
            opened: false,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start the subscription. A channel can be opened only once.
    pub fn open(&mut self) -> Result<mpsc::UnboundedReceiver<AdminEvent>> {
        if self.shared.is_closed() {
            return Err(ClientError::ChannelClosed);
        }
        if self.opened {
            return Err(ClientError::AlreadyOpen);
        }
        self.opened = true;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = self.transport.clone();
        let shared = self.shared.clone();
        let channel = self.channel.clone();
        let token = self.token.clone();

        shared.set_state(ConnectionState::Connecting);
        info!("[Realtime] Subscribing to {}", channel);

        self.task = Some(tokio::spawn(async move {
            let mut frames = match transport.connect(&channel, &token).await {
                Ok(frames) => frames,
                Err(e) => {
                    warn!("[Realtime] Failed to subscribe to {}: {}", channel, e);
                    shared.set_state(ConnectionState::Error);
                    return;
                }
            };
            shared.set_state(ConnectionState::Connected);
            info!("[Realtime] Subscribed to {}", channel);

            while let Some(item) = frames.next().await {
                if shared.is_closed() {
                    return;
                }
                let frame = match item {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("[Realtime] Stream error on {}: {}", channel, e);
                        shared.set_state(ConnectionState::Error);
                        return;
                    }
                };
                match AdminEvent::decode(&frame.event, &frame.data) {
                    Some(event) => {
                        debug!("[Realtime] {} on {}", event.name(), channel);
                        if events_tx.send(event).is_err() {
                            // Owner dropped the receiver.
                            break;
                        }
                    }
                    None => debug!("[Realtime] Ignoring {} on {}", frame.event, channel),
                }
            }

            info!("[Realtime] Stream for {} ended", channel);
            shared.set_state(ConnectionState::Disconnected);
        }));

        Ok(events_rx)
    }

    /// Release the subscription and close the connection. Returns `true`
    /// for the call that actually closed it; later calls are no-ops. Safe
    /// to call while the subscription is still being established.
    pub async fn close(&mut self) -> bool {
        if !self.begin_close() {
            return false;
        }
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled tasks resolve with a JoinError, nothing to report.
            let _ = task.await;
        }
        info!("[Realtime] Closed {}", self.channel);
        true
    }

    fn begin_close(&mut self) -> bool {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.state.send_replace(ConnectionState::Disconnected);
        true
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if self.begin_close() {
            if let Some(task) = self.task.take() {
                task.abort();
            }
        }
    }
}
