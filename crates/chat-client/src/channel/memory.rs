//! In-process transport
//!
//! Hands out a single frame stream fed through [`MemoryFeed`]. Useful for
//! wiring the admin client to an in-process source and for tests.

use super::{ChannelTransport, FrameStream};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chat_common::Frame;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub struct MemoryTransport {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<Frame>>>>,
    connects: AtomicUsize,
}

#[derive(Clone)]
pub struct MemoryFeed {
    tx: mpsc::UnboundedSender<Result<Frame>>,
}

impl MemoryFeed {
    /// Returns `false` once the stream has been dropped.
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(Ok(frame)).is_ok()
    }

    /// Inject a transport failure.
    pub fn fail(&self, error: ClientError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            receiver: Mutex::new(Some(rx)),
            connects: AtomicUsize::new(0),
        };
        (transport, MemoryFeed { tx })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelTransport for MemoryTransport {
    async fn connect(&self, _channel: &str, _token: &str) -> Result<FrameStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| ClientError::ChannelClosed)?
            .take()
            .ok_or(ClientError::ChannelClosed)?;

        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}
