//! Production effect interpreter over the Discord REST API.
//!
//! Maps each [`DiscordEffect`] to its REST call, with retry on transient
//! failures and rate limits. Discord serializes snowflakes as strings on the
//! wire, so this module keeps its own wire structs and converts into the
//! domain newtypes.

use serde::Deserialize;

use crate::effects::{
    DiscordEffect, DiscordInterpreter, DiscordResponse, Embed, MessageView, ReactionUser,
    ReactionView,
};
use crate::types::{ChannelId, MessageId, ThreadId, UserId};

use super::client::RestClient;
use super::error::DiscordApiError;
use super::retry::{RetryConfig, retry_with_backoff};

/// Page size when enumerating reaction users (Discord's maximum).
const REACTION_PAGE_SIZE: u32 = 100;

impl DiscordInterpreter for RestClient {
    async fn interpret(&self, effect: DiscordEffect) -> Result<DiscordResponse, DiscordApiError> {
        interpret_discord_effect(self, effect, RetryConfig::DEFAULT).await
    }
}

/// Interprets a Discord effect, executing it against the REST API.
pub async fn interpret_discord_effect(
    client: &RestClient,
    effect: DiscordEffect,
    retry: RetryConfig,
) -> Result<DiscordResponse, DiscordApiError> {
    match effect {
        DiscordEffect::FetchMessage { channel, message } => {
            retry_with_backoff(retry, || fetch_message(client, channel, message)).await
        }
        DiscordEffect::SendMessage {
            channel,
            content,
            embed,
        } => {
            retry_with_backoff(retry, || {
                send_message(client, channel, content.as_deref(), embed.as_ref())
            })
            .await
        }
        DiscordEffect::EditEmbed {
            channel,
            message,
            embed,
        } => retry_with_backoff(retry, || edit_embed(client, channel, message, &embed)).await,
        DiscordEffect::AddOwnReaction {
            channel,
            message,
            emoji,
        } => retry_with_backoff(retry, || own_reaction(client, channel, message, &emoji, true)).await,
        DiscordEffect::RemoveOwnReaction {
            channel,
            message,
            emoji,
        } => {
            retry_with_backoff(retry, || own_reaction(client, channel, message, &emoji, false))
                .await
        }
        DiscordEffect::ListReactionUsers {
            channel,
            message,
            emoji,
        } => retry_with_backoff(retry, || list_reaction_users(client, channel, message, &emoji)).await,
        DiscordEffect::CreateThread {
            channel,
            message,
            name,
            auto_archive_minutes,
        } => {
            retry_with_backoff(retry, || {
                create_thread(client, channel, message, &name, auto_archive_minutes)
            })
            .await
        }
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    embeds: Vec<Embed>,
    #[serde(default)]
    reactions: Vec<WireReaction>,
    #[serde(default)]
    thread: Option<WireThread>,
}

#[derive(Debug, Deserialize)]
struct WireReaction {
    emoji: WireEmoji,
    count: u32,
    #[serde(default)]
    me: bool,
}

#[derive(Debug, Deserialize)]
struct WireEmoji {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireThread {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

fn parse_snowflake(s: &str, what: &str) -> Result<u64, DiscordApiError> {
    s.parse::<u64>().map_err(|_| {
        DiscordApiError::permanent_without_source(format!("malformed {} snowflake: {:?}", what, s))
    })
}

impl WireMessage {
    fn into_view(self) -> Result<MessageView, DiscordApiError> {
        let id = MessageId(parse_snowflake(&self.id, "message")?);
        let channel_id = ChannelId(parse_snowflake(&self.channel_id, "channel")?);
        let thread_id = match self.thread {
            Some(t) => Some(ThreadId(parse_snowflake(&t.id, "thread")?)),
            None => None,
        };
        let reactions = self
            .reactions
            .into_iter()
            .filter_map(|r| {
                r.emoji.name.map(|name| ReactionView {
                    emoji: name,
                    count: r.count,
                    me: r.me,
                })
            })
            .collect();
        Ok(MessageView {
            id,
            channel_id,
            embeds: self.embeds,
            reactions,
            thread_id,
        })
    }
}

// ─── Operations ───────────────────────────────────────────────────────────────

async fn send(
    request: reqwest::RequestBuilder,
    context: &str,
) -> Result<reqwest::Response, DiscordApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| DiscordApiError::transient(format!("{}: transport failure", context), e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let retry_after = if code == 429 {
        response
            .json::<RateLimitBody>()
            .await
            .ok()
            .map(|b| b.retry_after)
    } else {
        None
    };
    Err(DiscordApiError::from_status(
        code,
        format!("{}: request failed", context),
        retry_after,
    ))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, DiscordApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| DiscordApiError::transient(format!("{}: malformed response body", context), e))
}

async fn fetch_message(
    client: &RestClient,
    channel: ChannelId,
    message: MessageId,
) -> Result<DiscordResponse, DiscordApiError> {
    let path = RestClient::message_path(channel, message);
    let response = send(
        client.request(reqwest::Method::GET, &path),
        "fetch message",
    )
    .await?;
    let wire: WireMessage = parse_json(response, "fetch message").await?;
    Ok(DiscordResponse::Message(wire.into_view()?))
}

async fn send_message(
    client: &RestClient,
    channel: ChannelId,
    content: Option<&str>,
    embed: Option<&Embed>,
) -> Result<DiscordResponse, DiscordApiError> {
    let mut body = serde_json::Map::new();
    if let Some(content) = content {
        body.insert("content".into(), content.into());
    }
    if let Some(embed) = embed {
        body.insert(
            "embeds".into(),
            serde_json::json!([serde_json::to_value(embed).map_err(|e| {
                DiscordApiError::permanent_without_source(format!("embed serialization: {}", e))
            })?]),
        );
    }
    let path = format!("/channels/{}/messages", channel);
    let response = send(
        client
            .request(reqwest::Method::POST, &path)
            .json(&serde_json::Value::Object(body)),
        "send message",
    )
    .await?;
    let wire: WireMessage = parse_json(response, "send message").await?;
    Ok(DiscordResponse::Sent(MessageId(parse_snowflake(
        &wire.id, "message",
    )?)))
}

async fn edit_embed(
    client: &RestClient,
    channel: ChannelId,
    message: MessageId,
    embed: &Embed,
) -> Result<DiscordResponse, DiscordApiError> {
    let path = RestClient::message_path(channel, message);
    let body = serde_json::json!({ "embeds": [embed] });
    send(
        client.request(reqwest::Method::PATCH, &path).json(&body),
        "edit embed",
    )
    .await?;
    Ok(DiscordResponse::Ack)
}

async fn own_reaction(
    client: &RestClient,
    channel: ChannelId,
    message: MessageId,
    emoji: &str,
    add: bool,
) -> Result<DiscordResponse, DiscordApiError> {
    let path = RestClient::own_reaction_path(channel, message, emoji);
    let (method, context) = if add {
        (reqwest::Method::PUT, "add own reaction")
    } else {
        (reqwest::Method::DELETE, "remove own reaction")
    };
    send(client.request(method, &path), context).await?;
    Ok(DiscordResponse::Ack)
}

async fn list_reaction_users(
    client: &RestClient,
    channel: ChannelId,
    message: MessageId,
    emoji: &str,
) -> Result<DiscordResponse, DiscordApiError> {
    let base = RestClient::reaction_users_path(channel, message, emoji);
    let mut users = Vec::new();
    let mut after: Option<String> = None;

    // Paginate: Discord returns at most 100 users per request.
    loop {
        let path = match &after {
            Some(id) => format!("{}?limit={}&after={}", base, REACTION_PAGE_SIZE, id),
            None => format!("{}?limit={}", base, REACTION_PAGE_SIZE),
        };
        let response = send(
            client.request(reqwest::Method::GET, &path),
            "list reaction users",
        )
        .await?;
        let page: Vec<WireUser> = parse_json(response, "list reaction users").await?;
        let page_len = page.len();
        for user in page {
            users.push(ReactionUser {
                id: UserId(parse_snowflake(&user.id, "user")?),
                name: user.username,
                bot: user.bot,
            });
        }
        if page_len < REACTION_PAGE_SIZE as usize {
            break;
        }
        after = users.last().map(|u| u.id.to_string());
    }

    Ok(DiscordResponse::Users(users))
}

async fn create_thread(
    client: &RestClient,
    channel: ChannelId,
    message: MessageId,
    name: &str,
    auto_archive_minutes: u32,
) -> Result<DiscordResponse, DiscordApiError> {
    let path = format!("/channels/{}/messages/{}/threads", channel, message);
    // Discord caps thread names at 100 characters.
    let name: String = name.chars().take(100).collect();
    let body = serde_json::json!({
        "name": name,
        "auto_archive_duration": auto_archive_minutes,
    });
    let response = send(
        client.request(reqwest::Method::POST, &path).json(&body),
        "create thread",
    )
    .await?;
    let wire: WireThread = parse_json(response, "create thread").await?;
    Ok(DiscordResponse::ThreadCreated(ThreadId(parse_snowflake(
        &wire.id, "thread",
    )?)))
}
