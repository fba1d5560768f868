use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use crate::config::BotConfig;
use crate::discord::DiscordApiError;
use crate::effects::DiscordEffect;
use crate::events::{ReactionAction, ReactionEvent};
use crate::persistence::PetitionStore;
use crate::render::{COLOR_EXPIRED, COLOR_OPEN, COLOR_REACHED, SIGNATURES_FIELD};
use crate::test_utils::FakeDiscord;
use crate::types::{ChannelId, GuildId, MessageId, NewPetition, PetitionStatus, RoleId, UserId};

use super::*;

const PEN: &str = "\u{1f58a}\u{fe0f}";
const PETITIONS: ChannelId = ChannelId(10);
const REVIEW: ChannelId = ChannelId(20);

fn test_config() -> BotConfig {
    BotConfig::new(GuildId(1), PETITIONS, REVIEW, RoleId(30))
}

fn setup() -> (Arc<FakeDiscord>, PetitionService<Arc<FakeDiscord>>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = PetitionStore::open(dir.path().join("petitions.json")).unwrap();
    let discord = Arc::new(FakeDiscord::new());
    let service = PetitionService::new(test_config(), store, Arc::clone(&discord));
    (discord, service, dir)
}

async fn create(
    service: &PetitionService<Arc<FakeDiscord>>,
    title: &str,
    description: &str,
) -> PetitionRef {
    service
        .create_petition(
            NewPetition {
                title: title.to_string(),
                description: description.to_string(),
                link: None,
            },
            UserId(77),
            "author",
        )
        .await
        .unwrap()
}

fn sign_event(message: MessageId) -> ReactionEvent {
    ReactionEvent {
        channel_id: PETITIONS,
        message_id: message,
        user_id: UserId(1),
        emoji: PEN.to_string(),
        action: ReactionAction::Added,
    }
}

async fn backdate(service: &PetitionService<Arc<FakeDiscord>>, id: MessageId, days: i64) {
    service
        .store()
        .update(|doc| {
            doc.get_mut(id).map(|p| p.created_at = Utc::now() - Duration::days(days))
        })
        .await
        .unwrap();
}

fn sig_field(discord: &FakeDiscord, id: MessageId) -> String {
    discord
        .embed_of(id)
        .and_then(|e| e.field(SIGNATURES_FIELD).map(|f| f.value.clone()))
        .unwrap()
}

mod creation {
    use super::*;

    #[tokio::test]
    async fn sets_up_anchor_reaction_thread_and_record() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "The pier is falling apart").await;

        assert!(!petition.is_recall);
        assert_eq!(petition.threshold, 25);
        assert!(discord.bot_reacted(petition.message_id, PEN));

        let embed = discord.embed_of(petition.message_id).unwrap();
        assert_eq!(embed.color, Some(COLOR_OPEN));
        assert_eq!(embed.field(SIGNATURES_FIELD).unwrap().value, "0/25");

        let stored = service.store().get(petition.message_id).await.unwrap();
        assert_eq!(stored.thread_id, Some(petition.thread_id));
        assert_eq!(stored.status(), PetitionStatus::Open);

        // The discussion thread got its seed message.
        let seeded = discord.sent_to(petition.thread_id.as_channel());
        assert_eq!(seeded.len(), 1);
        assert!(seeded[0].0.as_deref().unwrap().contains("Fix the docks"));
    }

    #[tokio::test]
    async fn recall_keywords_raise_the_threshold() {
        let (_discord, service, _dir) = setup();

        let by_title = create(&service, "Recall the mayor", "Time for a change").await;
        assert!(by_title.is_recall);
        assert_eq!(by_title.threshold, 30);

        let by_description =
            create(&service, "About the groundskeeper", "We should sack him").await;
        assert!(by_description.is_recall);

        let plain = create(&service, "More bike racks", "Please").await;
        assert!(!plain.is_recall);
        assert_eq!(plain.threshold, 25);
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let (_discord, service, _dir) = setup();

        let overlong = "x".repeat(201);
        let err = service
            .create_petition(
                NewPetition {
                    title: overlong,
                    description: "d".to_string(),
                    link: None,
                },
                UserId(1),
                "author",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = service
            .create_petition(
                NewPetition {
                    title: "   ".to_string(),
                    description: "d".to_string(),
                    link: None,
                },
                UserId(1),
                "author",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}

mod signatures {
    use super::*;

    #[tokio::test]
    async fn crossing_the_threshold_notifies_exactly_once() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "The pier is falling apart").await;
        let id = petition.message_id;

        for user in 1..=24u64 {
            discord.add_human_reaction(id, PEN, UserId(user));
        }
        let outcome = service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Reconciled {
                actual: 24,
                drift: true,
                crossed: false
            }
        );
        assert_eq!(sig_field(&discord, id), "24/25");
        assert!(discord.sent_to(REVIEW).is_empty());
        assert!(service.store().get(id).await.unwrap().is_open());

        discord.add_human_reaction(id, PEN, UserId(25));
        let outcome = service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert!(matches!(
            outcome,
            ReconcileOutcome::Reconciled { crossed: true, .. }
        ));

        let notifications = discord.sent_to(REVIEW);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].0.as_deref().unwrap().contains("<@&30>"));
        let notified = notifications[0].1.as_ref().unwrap();
        assert_eq!(notified.field("Signatures").unwrap().value, "25/25");

        let stored = service.store().get(id).await.unwrap();
        assert_eq!(stored.status(), PetitionStatus::ThresholdReached);
        let embed = discord.embed_of(id).unwrap();
        assert_eq!(embed.color, Some(COLOR_REACHED));

        // Further events find a closed petition and change nothing.
        let outcome = service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(discord.sent_to(REVIEW).len(), 1);
    }

    #[tokio::test]
    async fn recall_petitions_need_thirty_signatures() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Recall the mayor", "Enough").await;
        let id = petition.message_id;

        for user in 1..=25u64 {
            discord.add_human_reaction(id, PEN, UserId(user));
        }
        service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert_eq!(sig_field(&discord, id), "25/30");
        assert!(discord.sent_to(REVIEW).is_empty());
        assert!(service.store().get(id).await.unwrap().is_open());

        for user in 26..=30u64 {
            discord.add_human_reaction(id, PEN, UserId(user));
        }
        service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert_eq!(discord.sent_to(REVIEW).len(), 1);
        assert_eq!(
            service.store().get(id).await.unwrap().status(),
            PetitionStatus::ThresholdReached
        );
    }

    #[tokio::test]
    async fn placeholder_returns_when_the_last_signature_is_withdrawn() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "More bike racks", "Please").await;
        let id = petition.message_id;

        discord.add_human_reaction(id, PEN, UserId(5));
        service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert!(!discord.bot_reacted(id, PEN));
        assert_eq!(sig_field(&discord, id), "1/25");

        discord.remove_human_reaction(id, PEN, UserId(5));
        service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert!(discord.bot_reacted(id, PEN));
        assert_eq!(sig_field(&discord, id), "0/25");
    }

    #[tokio::test]
    async fn events_outside_scope_are_ignored() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "More bike racks", "Please").await;
        discord.clear_executed();

        let mut wrong_channel = sign_event(petition.message_id);
        wrong_channel.channel_id = ChannelId(9999);
        let outcome = service.handle_reaction_event(&wrong_channel).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped);

        let mut wrong_emoji = sign_event(petition.message_id);
        wrong_emoji.emoji = "\u{1f44d}".to_string();
        let outcome = service.handle_reaction_event(&wrong_emoji).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped);

        let unknown = sign_event(MessageId(424242));
        let outcome = service.handle_reaction_event(&unknown).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped);

        assert!(discord.executed().is_empty());
    }
}

mod audit {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn drift_converges_in_one_pass_and_the_next_is_quiet() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;

        // Signatures arrive while no events are delivered.
        for user in 1..=9u64 {
            discord.add_human_reaction(id, PEN, UserId(user));
        }

        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.corrected, 1);
        assert_eq!(service.store().get(id).await.unwrap().signatures, 9);
        assert_eq!(sig_field(&discord, id), "9/25");

        // Converged state: a second pass reads but writes nothing.
        discord.clear_executed();
        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report.corrected, 0);
        assert!(discord.executed().iter().all(|e| matches!(
            e,
            DiscordEffect::FetchMessage { .. } | DiscordEffect::ListReactionUsers { .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn a_rate_limited_item_is_retried_after_the_suggested_wait() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;
        discord.add_human_reaction(id, PEN, UserId(1));

        discord.fail_next(DiscordApiError::rate_limited("slow down", 3.0));

        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(service.store().get(id).await.unwrap().signatures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_hostile_rate_limit_wait_does_not_kill_the_sweep() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;
        discord.add_human_reaction(id, PEN, UserId(1));

        // A 429 body can carry anything; a negative wait falls back to the
        // fixed default instead of panicking.
        discord.fail_next(DiscordApiError::rate_limited("hostile body", -1.0));

        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(service.store().get(id).await.unwrap().signatures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_anchor_is_invalidated_and_excluded() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;
        discord.delete_message(id);

        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report.invalidated, 1);

        let stored = service.store().get(id).await.unwrap();
        assert_eq!(stored.status(), PetitionStatus::Invalid);
        assert_eq!(stored.invalid_reason.as_deref(), Some("Message not found"));
        assert!(stored.marked_invalid_at.is_some());

        let invalid = service.invalid_petitions().await;
        assert_eq!(invalid.len(), 1);
        let report = service.invalid_report().await;
        let listing = &report.fields[0];
        assert!(listing.name.contains("Fix the docks"));
        assert!(listing.value.contains("Message not found"));

        // Invalid petitions drop out of every later sweep.
        let report = service.run_signature_audit().await.unwrap();
        assert_eq!(report, AuditReport::default());
    }
}

mod expiry {
    use super::*;

    #[tokio::test]
    async fn late_signatures_expire_the_petition_instead_of_counting() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;
        backdate(&service, id, 31).await;

        discord.add_human_reaction(id, PEN, UserId(5));
        let outcome = service.handle_reaction_event(&sign_event(id)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Expired);

        let stored = service.store().get(id).await.unwrap();
        assert_eq!(stored.status(), PetitionStatus::Expired);
        assert_eq!(stored.signatures, 0);

        let embed = discord.embed_of(id).unwrap();
        assert_eq!(embed.color, Some(COLOR_EXPIRED));
        assert!(embed.title.as_deref().unwrap().starts_with("[EXPIRED]"));
        assert!(discord.sent_to(REVIEW).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_marks_only_petitions_past_the_window() {
        let (discord, service, _dir) = setup();
        let old = create(&service, "Fix the docks", "Falling apart").await;
        let fresh = create(&service, "More bike racks", "Please").await;
        backdate(&service, old.message_id, 31).await;

        let report = service.run_expiry_sweep().await.unwrap();
        assert_eq!(report.swept, 1);
        assert_eq!(report.expired, 1);

        assert_eq!(
            service.store().get(old.message_id).await.unwrap().status(),
            PetitionStatus::Expired
        );
        assert!(service.store().get(fresh.message_id).await.unwrap().is_open());
        assert_eq!(discord.embed_of(fresh.message_id).unwrap().color, Some(COLOR_OPEN));

        // Nothing left to do.
        let report = service.run_expiry_sweep().await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn a_day_short_of_the_window_stays_open() {
        let (_discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        backdate(&service, petition.message_id, 29).await;

        let outcome = service.reconcile_petition(petition.message_id).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Reconciled { .. }));
        assert!(service.store().get(petition.message_id).await.unwrap().is_open());
    }
}

mod repair {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn restores_thread_embed_and_count() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        let id = petition.message_id;

        discord.delete_thread(id);
        discord.tamper_embed(id, crate::effects::Embed::default());
        for user in 1..=3u64 {
            discord.add_human_reaction(id, PEN, UserId(user));
        }

        let report = service.repair_all().await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(report.repairs >= 2);

        let stored = service.store().get(id).await.unwrap();
        assert_eq!(stored.signatures, 3);
        let new_thread = stored.thread_id.unwrap();
        assert_ne!(new_thread, petition.thread_id);
        assert_eq!(discord.sent_to(new_thread.as_channel()).len(), 1);
        assert_eq!(sig_field(&discord, id), "3/25");
    }

    #[tokio::test(start_paused = true)]
    async fn leaves_overdue_petitions_for_the_expiry_sweep() {
        let (_discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;
        backdate(&service, petition.message_id, 40).await;

        let report = service.repair_all().await.unwrap();
        assert_eq!(report.skipped_expired, 1);
        assert_eq!(report.processed, 0);
        // Not marked: that is the expiry sweep's job.
        assert!(service.store().get(petition.message_id).await.unwrap().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn a_healthy_petition_needs_no_repairs() {
        let (discord, service, _dir) = setup();
        let petition = create(&service, "Fix the docks", "Falling apart").await;

        let report = service.repair_all().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.repairs, 0);
        assert!(discord.bot_reacted(petition.message_id, PEN));
    }
}
