//! Admin support chat client
//!
//! REST access to the support backend, the realtime channel subscription,
//! and the conversation state the admin panel renders.

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod view;

pub use api::{HttpSupportApi, SupportApi};
pub use channel::{ConnectionState, HttpChannelTransport, RealtimeChannel};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::ChatSession;
pub use store::ChatStore;

use std::sync::Arc;

/// Wire a session against the HTTP backend and relay described by `config`.
pub fn connect(config: ClientConfig) -> Result<ChatSession<HttpSupportApi>> {
    let transport = Arc::new(HttpChannelTransport::new(config.realtime_base.clone())?);
    let channel = RealtimeChannel::new(transport, config.channel.clone(), config.token.clone());
    let api = HttpSupportApi::new(config)?;
    Ok(ChatSession::new(api, channel))
}
