//! Exponential backoff retry for Discord API calls.
//!
//! Only transient and rate-limited errors are retried. Rate limits use the
//! server-suggested `retry_after` instead of the computed backoff delay.
//! NotFound and permanent errors surface immediately.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::DiscordApiError;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default retry configuration: 3 retries with 2s, 4s, 8s delays.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// Computes the delay for the given retry attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Upper bound on any server-suggested wait.
const MAX_SERVER_DELAY: Duration = Duration::from_secs(300);

/// Converts a wire `retry_after` into a sleepable duration.
///
/// The value is deserialized straight from a 429 response body, so it
/// cannot be trusted: negative, NaN, and infinite values yield `None`, and
/// finite values are capped at [`MAX_SERVER_DELAY`].
pub fn server_suggested_delay(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(
        secs.min(MAX_SERVER_DELAY.as_secs_f64()),
    ))
}

/// Runs an operation with retry on transient and rate-limited failures.
///
/// Rate limits sleep the server-suggested `retry_after`; transient failures
/// sleep the exponential backoff delay for the current attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DiscordApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DiscordApiError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind.is_retriable() && attempt < config.max_retries => {
                let delay = err
                    .retry_after
                    .and_then(server_suggested_delay)
                    .unwrap_or_else(|| config.delay_for_attempt(attempt));
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying Discord call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
