//! Embed construction for the petition system.
//!
//! Everything user-visible is built here: the anchor embed, its expired
//! rendering, the threshold-reached notification, the thread seed message,
//! and the admin reports. Keeping presentation in one place lets the
//! reconciler compare a live embed against the expected rendering to detect
//! drift.
//!
//! Notifications always render the petition's own derived threshold, never a
//! global constant, so recall petitions read `30/30` rather than `30/25`.

use crate::config::BotConfig;
use crate::types::{MessageId, Petition};

use crate::effects::{Embed, EmbedField, EmbedFooter};

/// Name of the embed field carrying the signature progress.
pub const SIGNATURES_FIELD: &str = "Signatures Needed";

/// Embed color for an open petition.
pub const COLOR_OPEN: u32 = 0x0099ff;

/// Embed color once the threshold is reached.
pub const COLOR_REACHED: u32 = 0x00ff00;

/// Embed color for an expired petition.
pub const COLOR_EXPIRED: u32 = 0xff0000;

/// Embed color for the invalid-petitions report.
pub const COLOR_REPORT: u32 = 0xff6b6b;

/// Maximum entries rendered in the invalid-petitions report.
const INVALID_REPORT_CAP: usize = 10;

/// Renders the signature progress value, e.g. `"24/25"`.
pub fn signatures_value(actual: u32, threshold: u32) -> String {
    format!("{}/{}", actual, threshold)
}

/// Builds the anchor embed for a petition at a given live signature count.
///
/// Deterministic given the record and the count; the reconciler rebuilds
/// this to detect a stale embed.
pub fn petition_embed(petition: &Petition, actual_signatures: u32, threshold: u32) -> Embed {
    let color = if petition.threshold_reached {
        COLOR_REACHED
    } else {
        COLOR_OPEN
    };

    let mut fields = vec![
        EmbedField::new("Author", format!("<@{}>", petition.author_id)),
        EmbedField::new(
            SIGNATURES_FIELD,
            signatures_value(actual_signatures, threshold),
        ),
    ];
    if let Some(link) = &petition.link {
        fields.push(EmbedField::new("Link", link.clone()));
    }

    Embed {
        title: Some(petition.title.clone()),
        description: Some(petition.description.clone()),
        color: Some(color),
        fields,
        footer: Some(EmbedFooter {
            text: "React with the pen emoji to sign this petition • Use /petition to create your own"
                .to_string(),
        }),
        timestamp: Some(petition.created_at),
    }
}

/// Builds the expired rendering of the anchor embed: red, title prefixed,
/// count frozen with an EXPIRED marker, footer swapped.
pub fn expired_embed(petition: &Petition, threshold: u32, expiry_days: i64) -> Embed {
    let mut fields = vec![
        EmbedField::new("Author", format!("<@{}>", petition.author_id)),
        EmbedField::new(
            SIGNATURES_FIELD,
            format!(
                "{} (EXPIRED)",
                signatures_value(petition.signatures, threshold)
            ),
        ),
    ];
    if let Some(link) = &petition.link {
        fields.push(EmbedField::new("Link", link.clone()));
    }

    Embed {
        title: Some(format!("[EXPIRED] {}", petition.title)),
        description: Some(petition.description.clone()),
        color: Some(COLOR_EXPIRED),
        fields,
        footer: Some(EmbedFooter {
            text: format!(
                "This petition expired after {} days • Use /petition to create your own",
                expiry_days
            ),
        }),
        timestamp: Some(petition.created_at),
    }
}

/// Builds the one-time threshold-reached notification for the review
/// channel. Returns the ping content and the embed.
pub fn threshold_notification(
    petition: &Petition,
    message_id: MessageId,
    threshold: u32,
    config: &BotConfig,
) -> (String, Embed) {
    let content = format!(
        "<@&{}> A petition has reached the signature threshold.",
        config.admin_role
    );

    let mut fields = vec![
        EmbedField::new("Petition Title", petition.title.clone()),
        EmbedField::new(
            "Author",
            format!("<@{}> ({})", petition.author_id, petition.author_name),
        ),
        EmbedField::new(
            "Signatures",
            signatures_value(petition.signatures, threshold),
        ),
        EmbedField::new(
            "Created",
            format!("<t:{}:R>", petition.created_at.timestamp()),
        ),
    ];
    if let Some(link) = &petition.link {
        fields.push(EmbedField::new("Link", link.clone()));
    }
    fields.push(EmbedField::new(
        "Original Message",
        format!(
            "https://discord.com/channels/{}/{}/{}",
            config.guild_id, config.petitions_channel, message_id
        ),
    ));

    let embed = Embed {
        title: Some("Petition Threshold Reached".to_string()),
        description: Some(format!(
            "A petition has reached {} signatures and requires admin review.",
            threshold
        )),
        color: Some(COLOR_REACHED),
        fields,
        footer: None,
        timestamp: Some(chrono::Utc::now()),
    };

    (content, embed)
}

/// The opening message for a petition's discussion thread.
pub fn thread_seed_message(petition: &Petition) -> String {
    format!(
        "Discussion thread for petition: **{}**\n\nCreated by <@{}>\nReact to the main message with the pen emoji to sign this petition.",
        petition.title, petition.author_id
    )
}

/// Builds the admin report of invalid petitions, capped at
/// [`INVALID_REPORT_CAP`] entries.
pub fn invalid_report_embed(entries: &[(String, Petition)]) -> Embed {
    if entries.is_empty() {
        return Embed {
            title: Some("No Invalid Petitions".to_string()),
            description: Some("All petitions are currently valid.".to_string()),
            color: Some(COLOR_REACHED),
            fields: vec![],
            footer: None,
            timestamp: Some(chrono::Utc::now()),
        };
    }

    let mut fields = Vec::new();
    for (key, petition) in entries.iter().take(INVALID_REPORT_CAP) {
        let reason = petition
            .invalid_reason
            .as_deref()
            .unwrap_or("Unknown reason");
        let marked = match petition.marked_invalid_at {
            Some(at) => format!("<t:{}:R>", at.timestamp()),
            None => "Unknown time".to_string(),
        };
        let title: String = petition.title.chars().take(100).collect();
        fields.push(EmbedField::new(
            title,
            format!("**ID:** `{}`\n**Reason:** {}\n**Marked:** {}", key, reason, marked),
        ));
    }
    if entries.len() > INVALID_REPORT_CAP {
        fields.push(EmbedField::new(
            "...",
            format!(
                "And {} more invalid petitions",
                entries.len() - INVALID_REPORT_CAP
            ),
        ));
    }

    Embed {
        title: Some("Invalid Petitions Report".to_string()),
        description: Some(format!("Found {} invalid petition(s)", entries.len())),
        color: Some(COLOR_REPORT),
        fields,
        footer: Some(EmbedFooter {
            text: "These petitions will be skipped in future checks".to_string(),
        }),
        timestamp: Some(chrono::Utc::now()),
    }
}
