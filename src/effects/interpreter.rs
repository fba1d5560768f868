//! The effect interpreter trait.
//!
//! An interpreter executes [`DiscordEffect`]s. The production implementation
//! lives in the `discord` module and talks to the REST API over reqwest; the
//! tests use an in-memory fake that simulates channel state.
//!
//! The error type is fixed to [`DiscordApiError`] rather than left
//! associated: callers must branch on the error kind (a `NotFound` on the
//! anchor message triggers invalidation, a `RateLimited` triggers a
//! server-suggested sleep), so the categorization has to be visible through
//! the trait.

use std::future::Future;

use crate::discord::error::DiscordApiError;

use super::discord::{DiscordEffect, DiscordResponse};

/// Executes Discord effects.
pub trait DiscordInterpreter: Send + Sync {
    /// Execute one effect and return its response.
    fn interpret(
        &self,
        effect: DiscordEffect,
    ) -> impl Future<Output = Result<DiscordResponse, DiscordApiError>> + Send;
}

impl<T: DiscordInterpreter> DiscordInterpreter for std::sync::Arc<T> {
    fn interpret(
        &self,
        effect: DiscordEffect,
    ) -> impl Future<Output = Result<DiscordResponse, DiscordApiError>> + Send {
        (**self).interpret(effect)
    }
}
