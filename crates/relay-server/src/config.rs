//! Relay server configuration

use std::net::SocketAddr;
use std::sync::Arc;

use crate::pubsub::{ChannelHub, HttpForwarder, Publisher};

/// Configuration for the relay server
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Address to bind the HTTP listener to
    pub addr: SocketAddr,
    /// Bearer token for private channels and the trigger endpoint
    pub channel_token: Option<String>,
    /// Broadcast buffer per channel
    pub channel_capacity: usize,
    /// Interval between keepalive lines on subscription streams
    pub heartbeat_secs: u64,
    /// External pub/sub endpoint; publishes are forwarded there when set
    pub forward_url: Option<String>,
    pub forward_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            channel_token: None,
            channel_capacity: 100,
            heartbeat_secs: 30,
            forward_url: None,
            forward_key: None,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_parse("RELAY_ADDR").unwrap_or(defaults.addr),
            channel_token: env_string("RELAY_CHANNEL_TOKEN"),
            channel_capacity: env_parse("RELAY_CHANNEL_CAPACITY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.channel_capacity),
            heartbeat_secs: env_parse("RELAY_HEARTBEAT_SECS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.heartbeat_secs),
            forward_url: env_string("PUBSUB_FORWARD_URL"),
            forward_key: env_string("PUBSUB_FORWARD_KEY"),
        }
    }

    pub fn with_channel_token(mut self, token: impl Into<String>) -> Self {
        self.channel_token = Some(token.into());
        self
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.trim().parse().ok())
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub hub: Arc<ChannelHub>,
    pub publisher: Arc<dyn Publisher>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let hub = Arc::new(ChannelHub::new(config.channel_capacity));
        let publisher: Arc<dyn Publisher> = match &config.forward_url {
            Some(url) => Arc::new(HttpForwarder::new(
                url.clone(),
                config.forward_key.clone(),
                hub.clone(),
            )?),
            None => hub.clone(),
        };
        Ok(Self {
            config,
            hub,
            publisher,
        })
    }

    /// State with a caller-supplied publisher, used to inject failures.
    pub fn with_publisher(config: RelayConfig, publisher: Arc<dyn Publisher>) -> Self {
        let hub = Arc::new(ChannelHub::new(config.channel_capacity));
        Self {
            config,
            hub,
            publisher,
        }
    }
}
