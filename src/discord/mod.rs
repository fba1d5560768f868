//! Discord REST integration.
//!
//! The production [`DiscordInterpreter`](crate::effects::DiscordInterpreter)
//! implementation: a reqwest-backed client, a categorized error type, and
//! retry with exponential backoff.

pub mod client;
pub mod error;
pub mod interpreter;
pub mod retry;

pub use client::RestClient;
pub use error::{DiscordApiError, DiscordErrorKind};
pub use retry::{RetryConfig, retry_with_backoff, server_suggested_delay};
