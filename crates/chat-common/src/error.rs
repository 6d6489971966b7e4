use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame is missing the {0} header")]
    MissingHeader(&'static str),
    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("frame header block exceeds {0} bytes")]
    HeaderTooLarge(usize),
    #[error("frame headers are not valid UTF-8")]
    InvalidUtf8,
}
