//! Client configuration

use chat_common::channels::ADMIN_CHANNEL;

/// Where the admin panel talks to and with which credential
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the support REST API
    pub api_base: String,
    /// Base URL of the realtime relay, defaults to `api_base`
    pub realtime_base: String,
    /// Bearer credential for the REST API and the private channel
    pub token: String,
    /// Private channel to watch
    pub channel: String,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            realtime_base: api_base.clone(),
            api_base,
            token: token.into(),
            channel: ADMIN_CHANNEL.to_string(),
        }
    }

    pub fn with_realtime_base(mut self, base: impl Into<String>) -> Self {
        self.realtime_base = base.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}
