//! A Discord community petition bot.
//!
//! Members open petitions in a dedicated channel; each petition is anchored
//! to a message carrying an embed, a pen-emoji reaction collects signatures,
//! and a discussion thread hangs off the anchor. When the signature count
//! crosses the petition's threshold the admin team is pinged once in a
//! review channel. Petitions expire after a fixed window, and petitions
//! whose anchor message disappears are quarantined as invalid.
//!
//! The platform never stores our counts for us, reactions mutate while the
//! process is down, and embeds can be tampered with out of band, so the
//! design treats live channel state as the single source of truth: every
//! path recomputes the signature count from the actual reaction list and
//! converges the stored record and the rendered embed toward it. Discord
//! calls are expressed as data ([`effects::DiscordEffect`]) and executed by
//! an interpreter, which keeps the coordination logic testable against an
//! in-memory double.

pub mod audit;
pub mod config;
pub mod discord;
pub mod effects;
pub mod events;
pub mod lifecycle;
pub mod persistence;
pub mod reconcile;
pub mod render;
pub mod server;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod test_utils;
