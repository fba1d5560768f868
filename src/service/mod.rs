//! The petition service: the coordinator that owns the store, the effect
//! interpreter, and the configuration.
//!
//! Every mutation of petition state flows through this object. Lifecycle
//! transitions are applied inside the store's critical section, so their
//! "did it flip now" results are exactly-once even when the event-driven
//! path and a concurrently running auditor race to reconcile the same
//! petition; both recompute from live reaction state and converge.
//!
//! Expiry is evaluated before the threshold in every path. A reaction that
//! arrives after the expiry window closes marks the petition expired
//! instead of counting.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::config::BotConfig;
use crate::discord::{DiscordApiError, DiscordErrorKind, server_suggested_delay};
use crate::effects::{
    DiscordEffect, DiscordInterpreter, DiscordResponse, Embed, MessageView, ReactionUser,
};
use crate::events::dispatcher::BoxFuture;
use crate::events::{ReactionEvent, ReactionSubscriber};
use crate::lifecycle;
use crate::persistence::{PetitionStore, StoreError};
use crate::reconcile;
use crate::render;
use crate::types::{
    MAX_DESCRIPTION_LEN, MAX_LINK_LEN, MAX_TITLE_LEN, MessageId, NewPetition, Petition,
    PetitionRef, UserId,
};

/// Invalidation reason recorded when the anchor message is gone.
const REASON_MESSAGE_NOT_FOUND: &str = "Message not found";

/// Errors that can occur during service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A Discord call failed (after the interpreter's own retries).
    #[error("Discord API error: {0}")]
    Api(#[from] DiscordApiError),

    /// The store could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Petition creation input failed validation.
    #[error("invalid petition input: {0}")]
    InvalidInput(String),

    /// An interpreter returned a response of the wrong shape.
    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome of reconciling one petition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Live state was read and the stored count refreshed.
    Reconciled {
        /// The authoritative signature count.
        actual: u32,
        /// Whether the stored count disagreed before this pass.
        drift: bool,
        /// Whether the threshold flipped in this pass (notification sent).
        crossed: bool,
    },
    /// The petition's expiry window had closed; it was marked expired.
    Expired,
    /// The anchor message is gone; the petition was marked invalid.
    Invalidated,
    /// Nothing to do (unknown id, terminal state, or filtered event).
    Skipped,
}

/// Result of a full signature audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub checked: usize,
    pub corrected: usize,
    pub expired: usize,
    pub invalidated: usize,
    pub failures: usize,
}

/// Result of an expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub swept: usize,
    pub expired: usize,
    pub invalidated: usize,
    pub failures: usize,
}

/// Result of the startup repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub processed: usize,
    pub repairs: usize,
    pub skipped_expired: usize,
    pub invalidated: usize,
    pub failures: usize,
}

/// The petition system coordinator.
pub struct PetitionService<I> {
    config: BotConfig,
    store: PetitionStore,
    interpreter: I,
}

impl<I: DiscordInterpreter> PetitionService<I> {
    /// Creates a service over an opened store.
    pub fn new(config: BotConfig, store: PetitionStore, interpreter: I) -> Self {
        PetitionService {
            config,
            store,
            interpreter,
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &PetitionStore {
        &self.store
    }

    // ─── Creation ─────────────────────────────────────────────────────────────

    /// Creates a petition: anchor message, placeholder reaction, discussion
    /// thread, and the stored record.
    pub async fn create_petition(
        &self,
        input: NewPetition,
        author_id: UserId,
        author_name: impl Into<String>,
    ) -> Result<PetitionRef> {
        let title = input.title.trim().to_string();
        let description = input.description.trim().to_string();
        let link = input
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        validate_input(&title, &description, link.as_deref())?;

        let is_recall = self.config.detect_recall(&title, &description);
        let mut petition = Petition::new(
            title.clone(),
            description,
            link,
            author_id,
            author_name,
            is_recall,
            Utc::now(),
        );
        let threshold = self.config.threshold_for(&petition);

        // Anchor message with the initial 0/threshold embed.
        let embed = render::petition_embed(&petition, 0, threshold);
        let message_id = match self
            .interpret(DiscordEffect::SendMessage {
                channel: self.config.petitions_channel,
                content: None,
                embed: Some(embed),
            })
            .await?
        {
            DiscordResponse::Sent(id) => id,
            _ => return Err(ServiceError::UnexpectedResponse("send anchor message")),
        };

        // Placeholder reaction so the vote affordance is visible from the
        // start.
        self.interpret(DiscordEffect::AddOwnReaction {
            channel: self.config.petitions_channel,
            message: message_id,
            emoji: self.config.sign_emoji.clone(),
        })
        .await?;

        // Discussion thread, seeded with an opening message.
        let thread_id = match self
            .interpret(DiscordEffect::CreateThread {
                channel: self.config.petitions_channel,
                message: message_id,
                name: title,
                auto_archive_minutes: self.config.thread_auto_archive_minutes,
            })
            .await?
        {
            DiscordResponse::ThreadCreated(id) => id,
            _ => return Err(ServiceError::UnexpectedResponse("create thread")),
        };
        petition.thread_id = Some(thread_id);

        self.interpret(DiscordEffect::SendMessage {
            channel: thread_id.as_channel(),
            content: Some(render::thread_seed_message(&petition)),
            embed: None,
        })
        .await?;

        let petition_ref = PetitionRef {
            message_id,
            thread_id,
            is_recall,
            threshold,
        };
        self.store
            .update(|doc| doc.insert(message_id, petition))
            .await?;

        info!(
            message = %message_id,
            is_recall,
            threshold,
            "petition created"
        );
        Ok(petition_ref)
    }

    // ─── Event handling ───────────────────────────────────────────────────────

    /// Entry point for live reaction events.
    ///
    /// Events outside the petitions channel, or with any emoji other than
    /// the sign emoji, are ignored at zero cost. Add and remove funnel into
    /// the same reconciliation; the count is always recomputed from live
    /// state, so duplicates and reordering are harmless.
    pub async fn handle_reaction_event(&self, event: &ReactionEvent) -> Result<ReconcileOutcome> {
        if event.channel_id != self.config.petitions_channel
            || event.emoji != self.config.sign_emoji
        {
            trace!(channel = %event.channel_id, "ignoring unrelated reaction event");
            return Ok(ReconcileOutcome::Skipped);
        }

        match self.store.get(event.message_id).await {
            None => {
                debug!(message = %event.message_id, "no petition recorded for message");
                Ok(ReconcileOutcome::Skipped)
            }
            Some(petition) if !petition.is_open() => Ok(ReconcileOutcome::Skipped),
            Some(_) => self.reconcile_petition(event.message_id).await,
        }
    }

    // ─── Reconciliation ───────────────────────────────────────────────────────

    /// Reconciles one petition against its live anchor state.
    ///
    /// Expiry is checked first; an expired petition is marked and its embed
    /// rewritten without touching the reaction state. Otherwise the
    /// authoritative count is recomputed, drift corrected, the placeholder
    /// managed, and the threshold transition applied exactly once.
    pub async fn reconcile_petition(&self, id: MessageId) -> Result<ReconcileOutcome> {
        let Some(petition) = self.store.get(id).await else {
            debug!(message = %id, "no petition recorded for message");
            return Ok(ReconcileOutcome::Skipped);
        };
        if !petition.is_open() {
            return Ok(ReconcileOutcome::Skipped);
        }

        let now = Utc::now();
        if petition.is_past_expiry(now, self.config.expiry_days) {
            return self.expire_petition(id, now).await;
        }

        let Some(view) = self.fetch_view(id).await? else {
            return Ok(ReconcileOutcome::Invalidated);
        };
        let signers = match view.reaction(&self.config.sign_emoji) {
            Some(_) => match self.list_signers(id).await? {
                Some(users) => users,
                None => return Ok(ReconcileOutcome::Invalidated),
            },
            None => Vec::new(),
        };

        let actual = reconcile::count_signatures(&signers);
        let drift = actual != petition.signatures;
        let threshold = self.config.threshold_for(&petition);

        // Count refresh and threshold transition, inside the store's
        // critical section. `crossed` is true for exactly one caller.
        let crossed = self
            .apply(id, |p| {
                p.signatures = actual;
                lifecycle::apply_threshold(p, actual, threshold)
            })
            .await?
            .unwrap_or(false);

        let Some(updated) = self.store.get(id).await else {
            return Ok(ReconcileOutcome::Skipped);
        };

        let plan = reconcile::plan_reconciliation(&updated, &view, &signers, &self.config);
        if drift {
            info!(
                message = %id,
                stored = petition.signatures,
                actual,
                "signature count drift corrected"
            );
        }
        for effect in plan.effects {
            if let Err(e) = self.interpret(effect).await {
                if e.is_not_found() {
                    self.mark_invalid(id).await?;
                    return Ok(ReconcileOutcome::Invalidated);
                }
                return Err(e.into());
            }
        }

        if crossed {
            info!(message = %id, title = %updated.title, actual, threshold, "petition reached threshold");
            let (content, embed) =
                render::threshold_notification(&updated, id, threshold, &self.config);
            self.interpret(DiscordEffect::SendMessage {
                channel: self.config.review_channel,
                content: Some(content),
                embed: Some(embed),
            })
            .await?;
        }

        Ok(ReconcileOutcome::Reconciled {
            actual,
            drift,
            crossed,
        })
    }

    /// Applies the expiry transition and rewrites the anchor embed.
    async fn expire_petition(&self, id: MessageId, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let flipped = self
            .apply(id, |p| {
                lifecycle::apply_expired(p, now, self.config.expiry_days)
            })
            .await?
            .unwrap_or(false);
        if !flipped {
            return Ok(ReconcileOutcome::Skipped);
        }

        let Some(updated) = self.store.get(id).await else {
            return Ok(ReconcileOutcome::Expired);
        };
        info!(message = %id, title = %updated.title, "petition expired");

        let threshold = self.config.threshold_for(&updated);
        let embed = render::expired_embed(&updated, threshold, self.config.expiry_days);
        if let Err(e) = self
            .interpret(DiscordEffect::EditEmbed {
                channel: self.config.petitions_channel,
                message: id,
                embed,
            })
            .await
        {
            if e.is_not_found() {
                self.mark_invalid(id).await?;
                return Ok(ReconcileOutcome::Invalidated);
            }
            return Err(e.into());
        }
        Ok(ReconcileOutcome::Expired)
    }

    // ─── Sweeps ───────────────────────────────────────────────────────────────

    /// Walks every open petition, recomputing and correcting signature
    /// drift. One petition's failure never aborts the sweep.
    pub async fn run_signature_audit(&self) -> Result<AuditReport> {
        let ids = self.store.read(|doc| doc.open_ids()).await;
        let mut report = AuditReport::default();

        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.sweep_pace).await;
            }
            match self.reconcile_with_rate_limit_retry(id).await {
                Ok(ReconcileOutcome::Reconciled { drift, .. }) => {
                    report.checked += 1;
                    if drift {
                        report.corrected += 1;
                    }
                }
                Ok(ReconcileOutcome::Expired) => report.expired += 1,
                Ok(ReconcileOutcome::Invalidated) => report.invalidated += 1,
                Ok(ReconcileOutcome::Skipped) => {}
                Err(e) => {
                    error!(message = %id, error = %e, "signature audit item failed");
                    report.failures += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            corrected = report.corrected,
            expired = report.expired,
            invalidated = report.invalidated,
            failures = report.failures,
            "signature audit complete"
        );
        Ok(report)
    }

    /// Walks every open petition, applying the expiry rule.
    pub async fn run_expiry_sweep(&self) -> Result<SweepReport> {
        let ids = self.store.read(|doc| doc.open_ids()).await;
        let mut report = SweepReport::default();
        let now = Utc::now();

        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.sweep_pace).await;
            }
            let Some(petition) = self.store.get(id).await else {
                continue;
            };
            if !petition.is_open() || !petition.is_past_expiry(now, self.config.expiry_days) {
                continue;
            }
            report.swept += 1;
            match self.expire_petition(id, now).await {
                Ok(ReconcileOutcome::Expired) => report.expired += 1,
                Ok(ReconcileOutcome::Invalidated) => report.invalidated += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(message = %id, error = %e, "expiry sweep item failed");
                    report.failures += 1;
                }
            }
        }

        if report.expired > 0 {
            info!(expired = report.expired, "expiry sweep marked petitions expired");
        }
        Ok(report)
    }

    /// One reconciliation with a single retry on a rate-limit signal,
    /// sleeping the platform-suggested backoff first.
    async fn reconcile_with_rate_limit_retry(&self, id: MessageId) -> Result<ReconcileOutcome> {
        match self.reconcile_petition(id).await {
            Err(ServiceError::Api(e)) if e.kind == DiscordErrorKind::RateLimited => {
                let wait = e
                    .retry_after
                    .and_then(server_suggested_delay)
                    .unwrap_or(std::time::Duration::from_secs(5));
                warn!(
                    message = %id,
                    wait_ms = wait.as_millis() as u64,
                    "rate limited during sweep, backing off"
                );
                tokio::time::sleep(wait).await;
                self.reconcile_petition(id).await
            }
            other => other,
        }
    }

    // ─── Repair ───────────────────────────────────────────────────────────────

    /// Heals structural drift across all open petitions: missing sign
    /// reaction, stale embed, missing discussion thread. Run once at
    /// startup and on admin request.
    pub async fn repair_all(&self) -> Result<RepairReport> {
        let ids = self.store.read(|doc| doc.open_ids()).await;
        let mut report = RepairReport::default();
        let now = Utc::now();

        info!(total = ids.len(), "starting petition repair pass");

        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.repair_pace).await;
            }
            let Some(petition) = self.store.get(id).await else {
                continue;
            };
            if !petition.is_open() {
                continue;
            }
            if petition.is_past_expiry(now, self.config.expiry_days) {
                // The expiry sweep that follows startup repair marks these.
                report.skipped_expired += 1;
                continue;
            }
            match self.repair_one(id).await {
                Ok(Some(repairs)) => {
                    report.processed += 1;
                    report.repairs += repairs;
                }
                Ok(None) => report.invalidated += 1,
                Err(e) => {
                    error!(message = %id, title = %petition.title, error = %e, "repair failed");
                    report.failures += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            repairs = report.repairs,
            skipped_expired = report.skipped_expired,
            invalidated = report.invalidated,
            "petition repair pass complete"
        );
        Ok(report)
    }

    /// Repairs one petition. Returns the number of corrections applied, or
    /// `None` if the anchor message is gone and the petition was
    /// invalidated.
    async fn repair_one(&self, id: MessageId) -> Result<Option<usize>> {
        let Some(view) = self.fetch_view(id).await? else {
            return Ok(None);
        };
        let signers = match view.reaction(&self.config.sign_emoji) {
            Some(_) => match self.list_signers(id).await? {
                Some(users) => users,
                None => return Ok(None),
            },
            None => Vec::new(),
        };

        let actual = reconcile::count_signatures(&signers);
        self.apply(id, |p| p.signatures = actual).await?;
        let Some(updated) = self.store.get(id).await else {
            return Ok(Some(0));
        };

        let plan = reconcile::plan_reconciliation(&updated, &view, &signers, &self.config);
        let mut repairs = plan.effects.len();
        for effect in plan.effects {
            if let Err(e) = self.interpret(effect).await {
                if e.is_not_found() {
                    self.mark_invalid(id).await?;
                    return Ok(None);
                }
                return Err(e.into());
            }
        }

        // A petition is supposed to have a discussion thread from creation;
        // recreate it if it is missing on the live message.
        if view.thread_id.is_none() {
            debug!(message = %id, "recreating missing discussion thread");
            let thread_id = match self
                .interpret(DiscordEffect::CreateThread {
                    channel: self.config.petitions_channel,
                    message: id,
                    name: updated.title.clone(),
                    auto_archive_minutes: self.config.thread_auto_archive_minutes,
                })
                .await?
            {
                DiscordResponse::ThreadCreated(t) => t,
                _ => return Err(ServiceError::UnexpectedResponse("create thread")),
            };
            self.interpret(DiscordEffect::SendMessage {
                channel: thread_id.as_channel(),
                content: Some(render::thread_seed_message(&updated)),
                embed: None,
            })
            .await?;
            self.apply(id, |p| p.thread_id = Some(thread_id)).await?;
            repairs += 1;
        }

        Ok(Some(repairs))
    }

    // ─── Admin ────────────────────────────────────────────────────────────────

    /// Snapshot of the invalid petitions for the admin report, sorted by
    /// key.
    pub async fn invalid_petitions(&self) -> Vec<(String, Petition)> {
        self.store.read(|doc| doc.invalid_entries()).await
    }

    /// Renders the admin report of invalid petitions.
    pub async fn invalid_report(&self) -> Embed {
        render::invalid_report_embed(&self.invalid_petitions().await)
    }

    // ─── Internals ────────────────────────────────────────────────────────────

    async fn interpret(
        &self,
        effect: DiscordEffect,
    ) -> std::result::Result<DiscordResponse, DiscordApiError> {
        self.interpreter.interpret(effect).await
    }

    /// Fetches the anchor message. A 404 marks the petition invalid and
    /// yields `None`; the caller stops processing that petition for good.
    async fn fetch_view(&self, id: MessageId) -> Result<Option<MessageView>> {
        match self
            .interpret(DiscordEffect::FetchMessage {
                channel: self.config.petitions_channel,
                message: id,
            })
            .await
        {
            Ok(DiscordResponse::Message(view)) => Ok(Some(view)),
            Ok(_) => Err(ServiceError::UnexpectedResponse("fetch message")),
            Err(e) if e.is_not_found() => {
                self.mark_invalid(id).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerates the sign-reaction users. Same 404 handling as
    /// [`Self::fetch_view`].
    async fn list_signers(&self, id: MessageId) -> Result<Option<Vec<ReactionUser>>> {
        match self
            .interpret(DiscordEffect::ListReactionUsers {
                channel: self.config.petitions_channel,
                message: id,
                emoji: self.config.sign_emoji.clone(),
            })
            .await
        {
            Ok(DiscordResponse::Users(users)) => Ok(Some(users)),
            Ok(_) => Err(ServiceError::UnexpectedResponse("list reaction users")),
            Err(e) if e.is_not_found() => {
                self.mark_invalid(id).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies a mutation to one stored petition inside the critical
    /// section. Returns `None` if the petition does not exist.
    async fn apply<R>(&self, id: MessageId, f: impl FnOnce(&mut Petition) -> R) -> Result<Option<R>> {
        Ok(self.store.update(|doc| doc.get_mut(id).map(f)).await?)
    }

    async fn mark_invalid(&self, id: MessageId) -> Result<()> {
        let flipped = self
            .apply(id, |p| {
                lifecycle::apply_invalid(p, REASON_MESSAGE_NOT_FOUND, Utc::now())
            })
            .await?
            .unwrap_or(false);
        if flipped {
            warn!(message = %id, "petition marked invalid: anchor message not found");
        }
        Ok(())
    }
}

fn validate_input(
    title: &str,
    description: &str,
    link: Option<&str>,
) -> std::result::Result<(), ServiceError> {
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    if description.is_empty() {
        return Err(ServiceError::InvalidInput(
            "description must not be empty".into(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "description exceeds {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    if let Some(link) = link {
        if link.chars().count() > MAX_LINK_LEN {
            return Err(ServiceError::InvalidInput(format!(
                "link exceeds {} characters",
                MAX_LINK_LEN
            )));
        }
    }
    Ok(())
}

/// Adapts the service to the reaction dispatcher. Failures are logged here;
/// the dispatcher and the gateway forwarder never see them.
pub struct PetitionEngineSubscriber<I> {
    service: Arc<PetitionService<I>>,
}

impl<I> PetitionEngineSubscriber<I> {
    pub fn new(service: Arc<PetitionService<I>>) -> Self {
        PetitionEngineSubscriber { service }
    }
}

impl<I: DiscordInterpreter + 'static> ReactionSubscriber for PetitionEngineSubscriber<I> {
    fn name(&self) -> &'static str {
        "petition-engine"
    }

    fn on_reaction<'a>(&'a self, event: &'a ReactionEvent) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Err(e) = self.service.handle_reaction_event(event).await {
                error!(message = %event.message_id, error = %e, "reaction handling failed");
            }
        })
    }
}
