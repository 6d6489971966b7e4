//! HTTP streaming transport for the relay's `/channels/{channel}/subscribe`

use super::{ChannelTransport, FrameStream};
use crate::api::join_url;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chat_common::{Frame, FrameDecoder};
use futures::StreamExt;
use tracing::debug;

pub struct HttpChannelTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpChannelTransport {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base: base.into(),
        })
    }
}

#[async_trait]
impl ChannelTransport for HttpChannelTransport {
    async fn connect(&self, channel: &str, token: &str) -> Result<FrameStream> {
        let url = join_url(&self.base, &["channels", channel, "subscribe"])?;
        debug!("[Realtime] GET {}", url);

        // The bearer travels with every handshake, public channels simply ignore it.
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let frames = resp
            .bytes_stream()
            .scan(FrameDecoder::new(), |decoder, chunk| {
                let items: Vec<Result<Frame>> = match chunk {
                    Ok(bytes) => match decoder.feed(&bytes) {
                        Ok(frames) => frames.into_iter().map(Ok).collect(),
                        Err(e) => vec![Err(ClientError::from(e))],
                    },
                    Err(e) => vec![Err(ClientError::Http(e.to_string()))],
                };
                futures::future::ready(Some(items))
            })
            .flat_map(futures::stream::iter)
            .boxed();

        Ok(frames)
    }
}
