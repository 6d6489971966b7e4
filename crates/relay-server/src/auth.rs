//! Bearer checks for private channels and the trigger endpoint

use crate::config::{AppState, RelayConfig};
use crate::error::{Error, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::{header, HeaderMap};
use tracing::debug;

pub async fn mw_require_channel_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_channel_token");

    check_channel_token(&state.config, req.headers())?;

    Ok(next.run(req).await)
}

/// Validate `Authorization: Bearer <token>` against the configured channel token.
pub fn check_channel_token(config: &RelayConfig, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = config.channel_token.as_deref() else {
        return Err(Error::AuthDisabled);
    };

    let auth_header = match headers.get(header::AUTHORIZATION) {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?,
        None => return Err(Error::AuthFailNoToken),
    };

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(Error::AuthFailTokenWrongFormat)?;

    if token != expected {
        return Err(Error::AuthFailInvalidToken);
    }

    Ok(())
}
