//! Effects-as-data for Discord operations.
//!
//! This module defines effect types that describe Discord REST operations
//! without executing them. The reconciler and repair logic are pure: they
//! take a view of live platform state and return the effects needed to
//! correct drift. Interpreters (the reqwest client in production, a fake in
//! tests) execute the effects.

pub mod discord;
pub mod interpreter;

pub use discord::{
    DiscordEffect, DiscordResponse, Embed, EmbedField, EmbedFooter, MessageView, ReactionUser,
    ReactionView,
};
pub use interpreter::DiscordInterpreter;
