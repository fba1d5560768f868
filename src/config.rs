//! Bot configuration.
//!
//! All tunables live here: channel and role IDs, the sign emoji, signature
//! thresholds, the expiry window, auditor intervals, and the pacing delays
//! inserted between consecutive Discord calls to respect rate limits.
//!
//! Compiled defaults match the production deployment; each value can be
//! overridden through a `PETITION_BOT_*` environment variable.

use std::time::Duration;

use crate::types::{ChannelId, GuildId, Petition, RoleId};

/// Signatures required for a normal petition.
const DEFAULT_SIGNATURE_THRESHOLD: u32 = 25;

/// Signatures required for a recall petition.
const DEFAULT_RECALL_THRESHOLD: u32 = 30;

/// Days before an open petition expires.
const DEFAULT_EXPIRY_DAYS: i64 = 30;

/// Keywords that make a petition a recall (case-insensitive substring match).
const RECALL_KEYWORDS: &[&str] = &["fire", "sack", "recall"];

/// Interval between signature audits (1 hour).
const DEFAULT_SIGNATURE_AUDIT_SECS: u64 = 3600;

/// Sleep after a failed signature audit before trying again (30 minutes).
const DEFAULT_SIGNATURE_RETRY_SECS: u64 = 1800;

/// Interval between expiry sweeps (6 hours).
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 21600;

/// Sleep after a failed expiry sweep before trying again (1 hour).
const DEFAULT_EXPIRY_RETRY_SECS: u64 = 3600;

/// Delay between consecutive petitions during a sweep (rate limiting).
const DEFAULT_SWEEP_PACE_MILLIS: u64 = 500;

/// Delay between consecutive petitions during startup repair (rate limiting;
/// repair makes more calls per petition than a sweep does).
const DEFAULT_REPAIR_PACE_MILLIS: u64 = 1000;

/// Thread auto-archive duration (7 days, in minutes — Discord's unit).
const DEFAULT_THREAD_AUTO_ARCHIVE_MINUTES: u32 = 10080;

/// Runtime configuration for the petition system.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The guild petitions live in (used for message links in notifications).
    pub guild_id: GuildId,

    /// Channel where petition anchor messages are posted. Reaction events
    /// from any other channel are ignored.
    pub petitions_channel: ChannelId,

    /// Channel that receives the one-time threshold-reached notification.
    pub review_channel: ChannelId,

    /// Role pinged in the threshold-reached notification.
    pub admin_role: RoleId,

    /// The designated sign emoji (a unicode emoji, e.g. the ballpoint pen).
    pub sign_emoji: String,

    /// Signatures required for a normal petition.
    pub signature_threshold: u32,

    /// Signatures required for a recall petition.
    pub recall_threshold: u32,

    /// Days before an open petition expires.
    pub expiry_days: i64,

    /// Interval between signature audits.
    pub signature_audit_interval: Duration,

    /// Sleep after a failed signature audit before retrying.
    pub signature_retry_backoff: Duration,

    /// Interval between expiry sweeps.
    pub expiry_sweep_interval: Duration,

    /// Sleep after a failed expiry sweep before retrying.
    pub expiry_retry_backoff: Duration,

    /// Delay between consecutive petitions during a sweep.
    pub sweep_pace: Duration,

    /// Delay between consecutive petitions during startup repair.
    pub repair_pace: Duration,

    /// Auto-archive duration for discussion threads, in minutes.
    pub thread_auto_archive_minutes: u32,
}

impl BotConfig {
    /// Creates a configuration with compiled defaults and the given IDs.
    pub fn new(
        guild_id: GuildId,
        petitions_channel: ChannelId,
        review_channel: ChannelId,
        admin_role: RoleId,
    ) -> Self {
        BotConfig {
            guild_id,
            petitions_channel,
            review_channel,
            admin_role,
            sign_emoji: "\u{1f58a}\u{fe0f}".to_string(),
            signature_threshold: DEFAULT_SIGNATURE_THRESHOLD,
            recall_threshold: DEFAULT_RECALL_THRESHOLD,
            expiry_days: DEFAULT_EXPIRY_DAYS,
            signature_audit_interval: Duration::from_secs(DEFAULT_SIGNATURE_AUDIT_SECS),
            signature_retry_backoff: Duration::from_secs(DEFAULT_SIGNATURE_RETRY_SECS),
            expiry_sweep_interval: Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS),
            expiry_retry_backoff: Duration::from_secs(DEFAULT_EXPIRY_RETRY_SECS),
            sweep_pace: Duration::from_millis(DEFAULT_SWEEP_PACE_MILLIS),
            repair_pace: Duration::from_millis(DEFAULT_REPAIR_PACE_MILLIS),
            thread_auto_archive_minutes: DEFAULT_THREAD_AUTO_ARCHIVE_MINUTES,
        }
    }

    /// Builds a configuration from `PETITION_BOT_*` environment variables.
    ///
    /// Required: `PETITION_BOT_GUILD_ID`, `PETITION_BOT_PETITIONS_CHANNEL`,
    /// `PETITION_BOT_REVIEW_CHANNEL`, `PETITION_BOT_ADMIN_ROLE`.
    ///
    /// Optional overrides: `PETITION_BOT_SIGN_EMOJI`,
    /// `PETITION_BOT_SIGNATURE_THRESHOLD`, `PETITION_BOT_RECALL_THRESHOLD`,
    /// `PETITION_BOT_EXPIRY_DAYS`, `PETITION_BOT_AUDIT_INTERVAL_SECS`,
    /// `PETITION_BOT_EXPIRY_SWEEP_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let guild_id = GuildId(required_u64("PETITION_BOT_GUILD_ID")?);
        let petitions_channel = ChannelId(required_u64("PETITION_BOT_PETITIONS_CHANNEL")?);
        let review_channel = ChannelId(required_u64("PETITION_BOT_REVIEW_CHANNEL")?);
        let admin_role = RoleId(required_u64("PETITION_BOT_ADMIN_ROLE")?);

        let mut config = BotConfig::new(guild_id, petitions_channel, review_channel, admin_role);

        if let Ok(emoji) = std::env::var("PETITION_BOT_SIGN_EMOJI") {
            config.sign_emoji = emoji;
        }
        if let Some(n) = optional_u64("PETITION_BOT_SIGNATURE_THRESHOLD") {
            config.signature_threshold = n as u32;
        }
        if let Some(n) = optional_u64("PETITION_BOT_RECALL_THRESHOLD") {
            config.recall_threshold = n as u32;
        }
        if let Some(n) = optional_u64("PETITION_BOT_EXPIRY_DAYS") {
            config.expiry_days = n as i64;
        }
        if let Some(n) = optional_u64("PETITION_BOT_AUDIT_INTERVAL_SECS") {
            config.signature_audit_interval = Duration::from_secs(n);
        }
        if let Some(n) = optional_u64("PETITION_BOT_EXPIRY_SWEEP_SECS") {
            config.expiry_sweep_interval = Duration::from_secs(n);
        }

        Ok(config)
    }

    /// Returns the derived signature threshold for a petition.
    ///
    /// The threshold is never stored; it is always derived from `is_recall`.
    pub fn threshold_for(&self, petition: &Petition) -> u32 {
        if petition.is_recall {
            self.recall_threshold
        } else {
            self.signature_threshold
        }
    }

    /// Decides at creation time whether a petition is a recall.
    ///
    /// Case-insensitive substring match of the recall keywords over the
    /// concatenated title and description.
    pub fn detect_recall(&self, title: &str, description: &str) -> bool {
        let text = format!("{} {}", title, description).to_lowercase();
        RECALL_KEYWORDS.iter().any(|kw| text.contains(kw))
    }
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable is set but not a valid integer ID.
    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

fn required_u64(var: &'static str) -> Result<u64, ConfigError> {
    let value = std::env::var(var).map_err(|_| ConfigError::MissingVar(var))?;
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidVar { var, value })
}

fn optional_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok())
}
