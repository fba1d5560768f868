//! In-memory Discord double shared by the service and server tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::discord::DiscordApiError;
use crate::effects::{
    DiscordEffect, DiscordInterpreter, DiscordResponse, Embed, MessageView, ReactionUser,
    ReactionView,
};
use crate::types::{ChannelId, MessageId, ThreadId, UserId};

/// The fake's own user ID, for `me` flags on reactions.
pub const BOT_USER: UserId = UserId(999_000);

#[derive(Debug, Clone)]
struct FakeMessage {
    channel: ChannelId,
    content: Option<String>,
    embed: Option<Embed>,
    // emoji -> reacting users, in arrival order
    reactions: Vec<(String, Vec<ReactionUser>)>,
    thread: Option<ThreadId>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    messages: HashMap<MessageId, FakeMessage>,
    executed: Vec<DiscordEffect>,
    pending_failures: VecDeque<DiscordApiError>,
}

/// An interpreter over a mutable in-memory "Discord". Messages sent through
/// it become fetchable; reactions and embeds are observable afterwards.
#[derive(Debug, Default)]
pub struct FakeDiscord {
    state: Mutex<FakeState>,
}

impl FakeDiscord {
    pub fn new() -> Self {
        FakeDiscord {
            state: Mutex::new(FakeState {
                next_id: 1000,
                ..FakeState::default()
            }),
        }
    }

    fn alloc_id(state: &mut FakeState) -> u64 {
        state.next_id += 1;
        state.next_id
    }

    /// Adds a human signature to a message, as if a user reacted.
    pub fn add_human_reaction(&self, message: MessageId, emoji: &str, user: UserId) {
        let mut state = self.state.lock().unwrap();
        let msg = state.messages.get_mut(&message).expect("message exists");
        let users = entry(&mut msg.reactions, emoji);
        if !users.iter().any(|u| u.id == user) {
            users.push(ReactionUser {
                id: user,
                name: format!("user-{}", user.0),
                bot: false,
            });
        }
    }

    /// Removes a human signature.
    pub fn remove_human_reaction(&self, message: MessageId, emoji: &str, user: UserId) {
        let mut state = self.state.lock().unwrap();
        let msg = state.messages.get_mut(&message).expect("message exists");
        if let Some(pos) = msg.reactions.iter().position(|(e, _)| e == emoji) {
            msg.reactions[pos].1.retain(|u| u.id != user);
            if msg.reactions[pos].1.is_empty() {
                msg.reactions.remove(pos);
            }
        }
    }

    /// Deletes a message outright; subsequent operations on it 404.
    pub fn delete_message(&self, message: MessageId) {
        self.state.lock().unwrap().messages.remove(&message);
    }

    /// Drops the thread from a message, as if it was deleted out of band.
    pub fn delete_thread(&self, message: MessageId) {
        let mut state = self.state.lock().unwrap();
        if let Some(msg) = state.messages.get_mut(&message) {
            msg.thread = None;
        }
    }

    /// Overwrites a message's embed, simulating out-of-band tampering.
    pub fn tamper_embed(&self, message: MessageId, embed: Embed) {
        let mut state = self.state.lock().unwrap();
        if let Some(msg) = state.messages.get_mut(&message) {
            msg.embed = Some(embed);
        }
    }

    /// True if the bot's own reaction is present for the emoji.
    pub fn bot_reacted(&self, message: MessageId, emoji: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(&message)
            .and_then(|m| m.reactions.iter().find(|(e, _)| e == emoji))
            .map(|(_, users)| users.iter().any(|u| u.id == BOT_USER))
            .unwrap_or(false)
    }

    /// The current embed on a message.
    pub fn embed_of(&self, message: MessageId) -> Option<Embed> {
        let state = self.state.lock().unwrap();
        state.messages.get(&message).and_then(|m| m.embed.clone())
    }

    /// Messages sent to a channel, as `(content, embed)` pairs in send order.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<(Option<String>, Option<Embed>)> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<(MessageId, Option<String>, Option<Embed>)> = state
            .messages
            .iter()
            .filter(|(_, m)| m.channel == channel)
            .map(|(id, m)| (*id, m.content.clone(), m.embed.clone()))
            .collect();
        out.sort_by_key(|(id, _, _)| id.0);
        out.into_iter().map(|(_, c, e)| (c, e)).collect()
    }

    /// Scripts a failure for the next interpreted effect. Queued failures
    /// are consumed in order, one per effect, before the world is touched.
    pub fn fail_next(&self, error: DiscordApiError) {
        self.state.lock().unwrap().pending_failures.push_back(error);
    }

    /// Every effect interpreted so far, in order.
    pub fn executed(&self) -> Vec<DiscordEffect> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Clears the executed-effect log.
    pub fn clear_executed(&self) {
        self.state.lock().unwrap().executed.clear();
    }
}

fn entry<'a>(
    reactions: &'a mut Vec<(String, Vec<ReactionUser>)>,
    emoji: &str,
) -> &'a mut Vec<ReactionUser> {
    if let Some(pos) = reactions.iter().position(|(e, _)| e == emoji) {
        return &mut reactions[pos].1;
    }
    reactions.push((emoji.to_string(), Vec::new()));
    &mut reactions.last_mut().unwrap().1
}

fn view_of(id: MessageId, msg: &FakeMessage) -> MessageView {
    MessageView {
        id,
        channel_id: msg.channel,
        embeds: msg.embed.clone().into_iter().collect(),
        reactions: msg
            .reactions
            .iter()
            .map(|(emoji, users)| ReactionView {
                emoji: emoji.clone(),
                count: users.len() as u32,
                me: users.iter().any(|u| u.id == BOT_USER),
            })
            .collect(),
        thread_id: msg.thread,
    }
}

impl DiscordInterpreter for FakeDiscord {
    async fn interpret(
        &self,
        effect: DiscordEffect,
    ) -> Result<DiscordResponse, DiscordApiError> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(effect.clone());
        if let Some(error) = state.pending_failures.pop_front() {
            return Err(error);
        }
        match effect {
            DiscordEffect::FetchMessage { message, .. } => match state.messages.get(&message) {
                Some(msg) => Ok(DiscordResponse::Message(view_of(message, msg))),
                None => Err(DiscordApiError::not_found("message not found")),
            },
            DiscordEffect::SendMessage {
                channel,
                content,
                embed,
            } => {
                let id = MessageId(Self::alloc_id(&mut state));
                state.messages.insert(
                    id,
                    FakeMessage {
                        channel,
                        content,
                        embed,
                        reactions: Vec::new(),
                        thread: None,
                    },
                );
                Ok(DiscordResponse::Sent(id))
            }
            DiscordEffect::EditEmbed { message, embed, .. } => {
                match state.messages.get_mut(&message) {
                    Some(msg) => {
                        msg.embed = Some(embed);
                        Ok(DiscordResponse::Ack)
                    }
                    None => Err(DiscordApiError::not_found("message not found")),
                }
            }
            DiscordEffect::AddOwnReaction { message, emoji, .. } => {
                match state.messages.get_mut(&message) {
                    Some(msg) => {
                        let users = entry(&mut msg.reactions, &emoji);
                        if !users.iter().any(|u| u.id == BOT_USER) {
                            users.push(ReactionUser {
                                id: BOT_USER,
                                name: "petition-bot".to_string(),
                                bot: true,
                            });
                        }
                        Ok(DiscordResponse::Ack)
                    }
                    None => Err(DiscordApiError::not_found("message not found")),
                }
            }
            DiscordEffect::RemoveOwnReaction { message, emoji, .. } => {
                match state.messages.get_mut(&message) {
                    Some(msg) => {
                        if let Some(pos) = msg.reactions.iter().position(|(e, _)| e == &emoji) {
                            msg.reactions[pos].1.retain(|u| u.id != BOT_USER);
                            if msg.reactions[pos].1.is_empty() {
                                msg.reactions.remove(pos);
                            }
                        }
                        Ok(DiscordResponse::Ack)
                    }
                    None => Err(DiscordApiError::not_found("message not found")),
                }
            }
            DiscordEffect::ListReactionUsers { message, emoji, .. } => {
                match state.messages.get(&message) {
                    Some(msg) => Ok(DiscordResponse::Users(
                        msg.reactions
                            .iter()
                            .find(|(e, _)| e == &emoji)
                            .map(|(_, users)| users.clone())
                            .unwrap_or_default(),
                    )),
                    None => Err(DiscordApiError::not_found("message not found")),
                }
            }
            DiscordEffect::CreateThread { message, .. } => {
                let thread = ThreadId(Self::alloc_id(&mut state));
                match state.messages.get_mut(&message) {
                    Some(msg) => {
                        msg.thread = Some(thread);
                        Ok(DiscordResponse::ThreadCreated(thread))
                    }
                    None => Err(DiscordApiError::not_found("message not found")),
                }
            }
        }
    }
}
