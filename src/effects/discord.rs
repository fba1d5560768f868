//! Discord API effect types.
//!
//! These types describe Discord REST operations as data, without executing
//! them. The reconciler and lifecycle logic return effects; interpreters
//! execute them. Effects carry full channel/message addressing because the
//! bot touches several channels (petitions, review, discussion threads).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, MessageId, ThreadId, UserId};

/// A Discord REST effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscordEffect {
    /// Fetch a message by ID. Fails with `NotFound` if it was deleted;
    /// callers escalate that to the invalidation path.
    FetchMessage {
        channel: ChannelId,
        message: MessageId,
    },

    /// Send a message, optionally with an embed.
    SendMessage {
        channel: ChannelId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        embed: Option<Embed>,
    },

    /// Replace a message's embed.
    EditEmbed {
        channel: ChannelId,
        message: MessageId,
        embed: Embed,
    },

    /// Add the bot's own reaction (the automation placeholder, or a missing
    /// sign reaction during repair).
    AddOwnReaction {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },

    /// Remove the bot's own reaction (placeholder retired once a human
    /// signs).
    RemoveOwnReaction {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },

    /// Enumerate the users who reacted with an emoji.
    ListReactionUsers {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },

    /// Start a public thread on a message.
    CreateThread {
        channel: ChannelId,
        message: MessageId,
        name: String,
        auto_archive_minutes: u32,
    },
}

/// Response to a Discord effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscordResponse {
    /// A fetched message.
    Message(MessageView),
    /// ID of a freshly sent message.
    Sent(MessageId),
    /// Users who reacted with the requested emoji.
    Users(Vec<ReactionUser>),
    /// ID of a freshly created thread.
    ThreadCreated(ThreadId),
    /// The effect succeeded and has no payload (reaction add/remove, edits).
    Ack,
}

/// The slice of a Discord message the petition system reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// Embeds on the message. The anchor message carries exactly one.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Reaction summaries, one per distinct emoji.
    #[serde(default)]
    pub reactions: Vec<ReactionView>,
    /// The thread hanging off this message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

impl MessageView {
    /// Finds the reaction summary for an emoji, if anyone (or the bot) has
    /// reacted with it.
    pub fn reaction(&self, emoji: &str) -> Option<&ReactionView> {
        self.reactions.iter().find(|r| r.emoji == emoji)
    }

    /// The message's first embed, if present.
    pub fn embed(&self) -> Option<&Embed> {
        self.embeds.first()
    }
}

/// Summary of one emoji's reactions on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionView {
    pub emoji: String,
    pub count: u32,
    /// Whether the bot's own reaction is among them.
    pub me: bool,
}

/// A user who reacted with the designated emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionUser {
    pub id: UserId,
    pub name: String,
    /// Automation flag. Bot reactions are never counted as signatures.
    pub bot: bool,
}

/// Structured embed data, matching Discord's embed JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A name/value pair inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

/// Embed footer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}
