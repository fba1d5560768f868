//! Discord REST client scoped to a single bot token.
//!
//! A thin wrapper around `reqwest::Client` that knows the API base URL and
//! the `Authorization: Bot <token>` header. The interpreter builds requests
//! through this client; it performs no effect logic of its own.

use crate::types::{ChannelId, MessageId};

/// Discord REST API base URL.
const API_BASE: &str = "https://discord.com/api/v10";

/// A Discord REST client.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl RestClient {
    /// Creates a client for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        RestClient {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Creates a client from the `DISCORD_BOT_TOKEN` environment variable.
    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_BOT_TOKEN").ok().map(Self::new)
    }

    /// Overrides the API base URL (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Starts a request with the bot authorization header attached.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.token))
    }

    /// Path of a message resource.
    pub fn message_path(channel: ChannelId, message: MessageId) -> String {
        format!("/channels/{}/messages/{}", channel, message)
    }

    /// Path of the bot's own reaction on a message.
    pub fn own_reaction_path(channel: ChannelId, message: MessageId, emoji: &str) -> String {
        format!(
            "/channels/{}/messages/{}/reactions/{}/@me",
            channel,
            message,
            percent_encode(emoji)
        )
    }

    /// Path enumerating users who reacted with an emoji.
    pub fn reaction_users_path(channel: ChannelId, message: MessageId, emoji: &str) -> String {
        format!(
            "/channels/{}/messages/{}/reactions/{}",
            channel,
            message,
            percent_encode(emoji)
        )
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Percent-encodes a string for use in a URL path segment.
///
/// Unicode emoji must be encoded byte-wise; unreserved characters pass
/// through untouched.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}
