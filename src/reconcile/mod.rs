//! Signature reconciliation.
//!
//! The reconciler is a pure planner: given a petition record, a view of its
//! live anchor message, and the users currently holding the sign reaction,
//! it computes the authoritative signature count and returns the effects
//! needed to correct drift. It performs no I/O; the service executes the
//! plan and persists the count.
//!
//! Because the count is always recomputed from live state rather than
//! incremented per event, running the planner twice on unchanged state
//! yields the same count and an empty effect list. That idempotence is what
//! makes out-of-order and duplicate reaction events harmless.

use std::collections::BTreeSet;

use crate::config::BotConfig;
use crate::effects::{DiscordEffect, MessageView, ReactionUser};
use crate::render;
use crate::types::Petition;

/// The outcome of planning one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Count of distinct non-bot users holding the sign reaction. The
    /// authoritative signature count.
    pub actual_signatures: u32,

    /// Effects to execute: placeholder reaction management and at most one
    /// embed correction.
    pub effects: Vec<DiscordEffect>,

    /// Whether the live embed disagreed with the expected rendering.
    pub embed_stale: bool,
}

impl ReconcilePlan {
    /// True when live state already matched: nothing to execute.
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Counts distinct non-bot signers.
///
/// The automation placeholder (and any other bot reaction) is never a
/// signature.
pub fn count_signatures(signers: &[ReactionUser]) -> u32 {
    let humans: BTreeSet<_> = signers.iter().filter(|u| !u.bot).map(|u| u.id).collect();
    humans.len() as u32
}

/// Plans the reconciliation of one petition against its live anchor state.
///
/// `signers` is the enumeration of users holding the sign reaction (empty
/// when the reaction is absent entirely). The petition record should already
/// carry any transition decided for this pass, so the expected embed
/// rendering (color in particular) matches the post-transition state.
pub fn plan_reconciliation(
    petition: &Petition,
    view: &MessageView,
    signers: &[ReactionUser],
    config: &BotConfig,
) -> ReconcilePlan {
    let actual_signatures = count_signatures(signers);
    let mut effects = Vec::new();

    // Placeholder management. The anchor must always carry at least one sign
    // reaction so the vote affordance stays visible; the bot's own reaction
    // fills that role at zero human signatures and retires once a human
    // signs.
    match view.reaction(&config.sign_emoji) {
        None => {
            effects.push(DiscordEffect::AddOwnReaction {
                channel: view.channel_id,
                message: view.id,
                emoji: config.sign_emoji.clone(),
            });
        }
        Some(reaction) => {
            if actual_signatures == 0 && !reaction.me {
                effects.push(DiscordEffect::AddOwnReaction {
                    channel: view.channel_id,
                    message: view.id,
                    emoji: config.sign_emoji.clone(),
                });
            } else if actual_signatures > 0 && reaction.me {
                effects.push(DiscordEffect::RemoveOwnReaction {
                    channel: view.channel_id,
                    message: view.id,
                    emoji: config.sign_emoji.clone(),
                });
            }
        }
    }

    // Embed drift. Compare the live rendering against the expected one and
    // plan a single corrective edit if they disagree.
    let threshold = config.threshold_for(petition);
    let expected = render::petition_embed(petition, actual_signatures, threshold);
    let embed_stale = match view.embed() {
        None => true,
        Some(live) => {
            live.color != expected.color
                || live.field(render::SIGNATURES_FIELD).map(|f| f.value.as_str())
                    != expected
                        .field(render::SIGNATURES_FIELD)
                        .map(|f| f.value.as_str())
        }
    };
    if embed_stale {
        effects.push(DiscordEffect::EditEmbed {
            channel: view.channel_id,
            message: view.id,
            embed: expected,
        });
    }

    ReconcilePlan {
        actual_signatures,
        effects,
        embed_stale,
    }
}
