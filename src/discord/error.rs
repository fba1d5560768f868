//! Discord API error types.
//!
//! The error kind drives every retry and lifecycle decision in the bot:
//!
//! - **Transient** failures (5xx, network) are retried with backoff and
//!   never surfaced to users.
//! - **RateLimited** (429) carries the server-suggested `retry_after`; the
//!   caller sleeps exactly that long before retrying.
//! - **NotFound** (404) on an anchor message is terminal for the petition:
//!   it is marked invalid and never fetched again.
//! - **Permanent** failures (remaining 4xx, auth) require human attention.

use std::fmt;
use thiserror::Error;

/// The kind of Discord API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscordErrorKind {
    /// Transient error, safe to retry with backoff (5xx, network timeouts).
    Transient,

    /// HTTP 429. Retry after the server-suggested delay.
    RateLimited,

    /// HTTP 404. The resource is gone; callers escalate to invalidation
    /// rather than retrying.
    NotFound,

    /// Everything else (auth failures, bad requests). Not retriable.
    Permanent,
}

impl DiscordErrorKind {
    /// True if a retry can reasonably succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DiscordErrorKind::Transient | DiscordErrorKind::RateLimited
        )
    }
}

/// A Discord API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct DiscordApiError {
    /// The kind of error.
    pub kind: DiscordErrorKind,

    /// The HTTP status code, if the request got that far.
    pub status_code: Option<u16>,

    /// A human-readable description.
    pub message: String,

    /// Server-suggested retry delay in seconds (rate limits only).
    pub retry_after: Option<f64>,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for DiscordApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "Discord API error (HTTP {}): {}", code, self.message),
            None => write!(f, "Discord API error: {}", self.message),
        }
    }
}

impl DiscordApiError {
    /// Creates a transient error from a transport failure.
    pub fn transient(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self {
            kind: DiscordErrorKind::Transient,
            status_code: source.status().map(|s| s.as_u16()),
            message: message.into(),
            retry_after: None,
            source: Some(source),
        }
    }

    /// Creates a transient error without a transport source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: DiscordErrorKind::Transient,
            status_code: None,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Creates a rate-limit error with the server-suggested delay.
    pub fn rate_limited(message: impl Into<String>, retry_after: f64) -> Self {
        Self {
            kind: DiscordErrorKind::RateLimited,
            status_code: Some(429),
            message: message.into(),
            retry_after: Some(retry_after),
            source: None,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: DiscordErrorKind::NotFound,
            status_code: Some(404),
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Creates a permanent error with a status code.
    pub fn permanent(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind: DiscordErrorKind::Permanent,
            status_code: Some(status_code),
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Creates a permanent error without a status code.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: DiscordErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Categorizes an HTTP status into an error.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<f64>) -> Self {
        let message = message.into();
        match status {
            404 => Self::not_found(message),
            429 => Self::rate_limited(message, retry_after.unwrap_or(5.0)),
            s if s >= 500 => Self {
                kind: DiscordErrorKind::Transient,
                status_code: Some(s),
                message,
                retry_after: None,
                source: None,
            },
            s => Self::permanent(message, s),
        }
    }

    /// True if this error is a 404 on the requested resource.
    pub fn is_not_found(&self) -> bool {
        self.kind == DiscordErrorKind::NotFound
    }
}
