//! HTTP ingress: the gateway forwarder posts reaction events here, and a
//! health endpoint answers liveness probes.
//!
//! The server acknowledges events with 202 after dispatch; subscribers
//! swallow and log their own failures, so the forwarder never sees them and
//! never retries on our behalf.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::debug;

use crate::events::{ReactionDispatcher, ReactionEvent};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ReactionDispatcher>,
}

/// Builds the ingress router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/reaction", post(reaction_event))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn reaction_event(
    State(state): State<AppState>,
    Json(event): Json<ReactionEvent>,
) -> StatusCode {
    debug!(
        channel = %event.channel_id,
        message = %event.message_id,
        action = ?event.action,
        "reaction event received"
    );
    state.dispatcher.dispatch(&event).await;
    StatusCode::ACCEPTED
}
