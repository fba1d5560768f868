//! Reaction events and their dispatch.
//!
//! Both gateway callbacks (reaction added, reaction removed) funnel into one
//! event type. Subscribers register with the dispatcher first-class, in
//! order; there is no handler-wrapping or rebinding involved in adding a
//! subscriber.

pub mod dispatcher;

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, MessageId, UserId};

pub use dispatcher::{ReactionDispatcher, ReactionSubscriber};

/// Whether a reaction was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// A raw reaction event from the gateway.
///
/// No ordering is assumed between add and remove events. Handlers recompute
/// derived state from live platform state, so processing the same event
/// twice or out of order is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub action: ReactionAction,
}
