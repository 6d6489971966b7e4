use chat_common::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("frame error: {0}")]
    Codec(#[from] CodecError),
    #[error("channel already opened")]
    AlreadyOpen,
    #[error("channel closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
