//! The petition record and its derived state.
//!
//! A petition is identified by the ID of its anchor message (the message in
//! the petitions channel carrying the descriptive embed and the sign
//! reaction). The record is never deleted; it accumulates monotonic state
//! flags (`threshold_reached`, `expired`, `invalid`) over its lifetime.
//!
//! The `signatures` field is a cache of a derived value. The authoritative
//! count is always the set of non-bot users with the sign reaction on the
//! anchor message; reconciliation overwrites the cache from live state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MessageId, ThreadId, UserId};

/// Maximum petition title length.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum petition description length.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Maximum supporting-link length.
pub const MAX_LINK_LEN: usize = 500;

/// A stored petition record, keyed externally by its anchor message ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Petition {
    /// Petition title (at most [`MAX_TITLE_LEN`] characters).
    pub title: String,

    /// Petition body text (at most [`MAX_DESCRIPTION_LEN`] characters).
    pub description: String,

    /// Optional supporting link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Creator's user ID. Authoritative identity.
    pub author_id: UserId,

    /// Creator's display name at creation time. A display cache only.
    pub author_name: String,

    /// Creation timestamp (UTC).
    pub created_at: DateTime<Utc>,

    /// The discussion thread attached to the anchor message, if one exists.
    /// Repair recreates a missing thread lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,

    /// Cached signature count. Authoritative only immediately after
    /// reconciliation.
    pub signatures: u32,

    /// Whether this petition is a recall, decided once at creation from
    /// keyword matching over title + description. Immutable afterwards.
    pub is_recall: bool,

    /// Set exactly once when the signature count first meets the threshold.
    /// Never cleared.
    pub threshold_reached: bool,

    /// Set when the expiry window closes without the threshold being met.
    /// Never cleared.
    pub expired: bool,

    /// Set when the anchor message can no longer be fetched. Terminal: an
    /// invalid petition is excluded from all further processing.
    #[serde(default)]
    pub invalid: bool,

    /// Why the petition was marked invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    /// When the petition was marked invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_invalid_at: Option<DateTime<Utc>>,
}

/// Derived lifecycle status, in override order: invalid beats everything,
/// expired and threshold-reached beat open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionStatus {
    /// Still collecting signatures.
    Open,
    /// Reached its signature threshold. No further reconciliation.
    ThresholdReached,
    /// Expiry window closed before the threshold was met.
    Expired,
    /// Anchor message gone. Permanently excluded from processing.
    Invalid,
}

impl Petition {
    /// Creates a new open petition.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        link: Option<String>,
        author_id: UserId,
        author_name: impl Into<String>,
        is_recall: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Petition {
            title: title.into(),
            description: description.into(),
            link,
            author_id,
            author_name: author_name.into(),
            created_at,
            thread_id: None,
            signatures: 0,
            is_recall,
            threshold_reached: false,
            expired: false,
            invalid: false,
            invalid_reason: None,
            marked_invalid_at: None,
        }
    }

    /// Returns the derived lifecycle status from the stored flags.
    pub fn status(&self) -> PetitionStatus {
        if self.invalid {
            PetitionStatus::Invalid
        } else if self.expired {
            PetitionStatus::Expired
        } else if self.threshold_reached {
            PetitionStatus::ThresholdReached
        } else {
            PetitionStatus::Open
        }
    }

    /// True when no terminal flag is set, i.e. the petition still takes part
    /// in reconciliation and sweeps.
    pub fn is_open(&self) -> bool {
        self.status() == PetitionStatus::Open
    }

    /// True when the petition's age exceeds the expiry window at `now`.
    ///
    /// This is the time condition only; whether it results in an `expired`
    /// transition also depends on the monotonic flags (see the lifecycle
    /// module).
    pub fn is_past_expiry(&self, now: DateTime<Utc>, expiry_days: i64) -> bool {
        now - self.created_at > Duration::days(expiry_days)
    }
}

/// Input for petition creation, before an anchor message exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPetition {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Reference to a freshly created petition, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetitionRef {
    /// The anchor message ID (the petition's key).
    pub message_id: MessageId,
    /// The discussion thread created alongside the anchor.
    pub thread_id: ThreadId,
    /// Whether recall keywords were detected.
    pub is_recall: bool,
    /// The derived signature threshold for this petition.
    pub threshold: u32,
}
