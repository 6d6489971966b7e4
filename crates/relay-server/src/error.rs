use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Auth Errors
    #[error("No auth token found")]
    AuthFailNoToken,
    #[error("Auth token wrong format")]
    AuthFailTokenWrongFormat,
    #[error("Invalid channel token")]
    AuthFailInvalidToken,
    #[error("Private channels are disabled")]
    AuthDisabled,

    // Relay Errors
    #[error("Failed to send message")]
    PublishFailed,

    // Generic
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::AuthFailNoToken
            | Error::AuthFailTokenWrongFormat
            | Error::AuthFailInvalidToken
            | Error::AuthDisabled => StatusCode::UNAUTHORIZED,
            Error::PublishFailed | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
