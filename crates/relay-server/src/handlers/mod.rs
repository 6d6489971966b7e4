//! HTTP handlers and router
//!
//! Orchestrates the relay endpoint and the channel routes.

use crate::auth::mw_require_channel_token;
use crate::config::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod channels;
pub mod relay;

pub fn router(state: AppState) -> Router<AppState> {
    // Triggers publish arbitrary events, so they always need the channel token.
    let triggers = Router::new()
        .route("/api/channels/{channel}/events", post(channels::trigger_event))
        .route_layer(middleware::from_fn_with_state(
            state,
            mw_require_channel_token,
        ));

    Router::new()
        .route("/api/messages", post(relay::relay_message))
        .route("/channels/{channel}/subscribe", get(channels::subscribe))
        .merge(triggers)
}
