//! Petition state transitions.
//!
//! Pure functions that apply lifecycle transitions to a petition record,
//! each guarded so a flag is set at most once and terminal states suppress
//! later transitions. Every function returns whether it changed the record,
//! which is what makes side effects (the one-time admin notification, the
//! expired embed edit) idempotent: callers act only on a `true` return, and
//! because the apply runs inside the store's critical section, exactly one
//! caller ever observes the flip.
//!
//! Ordering: expiry is evaluated before the threshold in every path, event
//! handler and auditor alike. Expiry is time-absolute, so a reaction that
//! arrives after the window closes marks the petition expired instead of
//! counting. (The two checks were ordered inconsistently between paths in an
//! earlier iteration of the system; this is the deliberate resolution.)

use chrono::{DateTime, Utc};

use crate::types::Petition;

/// Marks a petition expired if its window has closed and no terminal flag is
/// already set. Returns true if the flag flipped now.
///
/// A petition that already reached its threshold is never expired, and an
/// invalid petition is excluded from everything.
pub fn apply_expired(petition: &mut Petition, now: DateTime<Utc>, expiry_days: i64) -> bool {
    if !petition.is_open() {
        return false;
    }
    if !petition.is_past_expiry(now, expiry_days) {
        return false;
    }
    petition.expired = true;
    true
}

/// Marks a petition as having reached its threshold if the live count meets
/// it and no terminal flag is already set. Returns true if the flag flipped
/// now.
///
/// An expired petition cannot later reach the threshold: reconciliation is
/// skipped for expired petitions, and this guard backstops that.
pub fn apply_threshold(petition: &mut Petition, actual_signatures: u32, threshold: u32) -> bool {
    if !petition.is_open() {
        return false;
    }
    if actual_signatures < threshold {
        return false;
    }
    petition.threshold_reached = true;
    true
}

/// Marks a petition invalid. Returns true if the flag flipped now.
///
/// Invalidation overrides everything and is permanent; the reason and
/// timestamp are recorded for the admin report.
pub fn apply_invalid(
    petition: &mut Petition,
    reason: impl Into<String>,
    now: DateTime<Utc>,
) -> bool {
    if petition.invalid {
        return false;
    }
    petition.invalid = true;
    petition.invalid_reason = Some(reason.into());
    petition.marked_invalid_at = Some(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::{Duration, TimeZone};

    fn petition_created_at(created: DateTime<Utc>) -> Petition {
        Petition::new("t", "d", None, UserId(1), "a", false, created)
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    mod expiry {
        use super::*;

        #[test]
        fn flips_once_after_window() {
            let mut p = petition_created_at(created());
            let after = created() + Duration::days(30) + Duration::seconds(1);
            assert!(apply_expired(&mut p, after, 30));
            assert!(p.expired);
            // Second evaluation is a no-op.
            assert!(!apply_expired(&mut p, after, 30));
        }

        #[test]
        fn does_not_fire_inside_window() {
            let mut p = petition_created_at(created());
            let before = created() + Duration::days(30) - Duration::seconds(1);
            assert!(!apply_expired(&mut p, before, 30));
            assert!(!p.expired);
        }

        #[test]
        fn suppressed_after_threshold_reached() {
            let mut p = petition_created_at(created());
            p.threshold_reached = true;
            let after = created() + Duration::days(60);
            assert!(!apply_expired(&mut p, after, 30));
            assert!(!p.expired);
        }

        #[test]
        fn suppressed_for_invalid() {
            let mut p = petition_created_at(created());
            p.invalid = true;
            let after = created() + Duration::days(60);
            assert!(!apply_expired(&mut p, after, 30));
        }
    }

    mod threshold {
        use super::*;

        #[test]
        fn flips_once_at_threshold() {
            let mut p = petition_created_at(created());
            assert!(!apply_threshold(&mut p, 24, 25));
            assert!(apply_threshold(&mut p, 25, 25));
            assert!(p.threshold_reached);
            // Re-evaluation with a higher count does not flip again.
            assert!(!apply_threshold(&mut p, 26, 25));
        }

        #[test]
        fn suppressed_after_expiry() {
            let mut p = petition_created_at(created());
            p.expired = true;
            assert!(!apply_threshold(&mut p, 100, 25));
            assert!(!p.threshold_reached);
        }

        #[test]
        fn monotonic_never_clears() {
            let mut p = petition_created_at(created());
            apply_threshold(&mut p, 30, 25);
            // Signatures dropping below the threshold later does not revert it.
            assert!(!apply_threshold(&mut p, 10, 25));
            assert!(p.threshold_reached);
        }
    }

    mod invalid {
        use super::*;

        #[test]
        fn records_reason_and_time() {
            let mut p = petition_created_at(created());
            let now = Utc::now();
            assert!(apply_invalid(&mut p, "Message not found", now));
            assert_eq!(p.invalid_reason.as_deref(), Some("Message not found"));
            assert_eq!(p.marked_invalid_at, Some(now));
        }

        #[test]
        fn is_terminal_and_idempotent() {
            let mut p = petition_created_at(created());
            assert!(apply_invalid(&mut p, "first", Utc::now()));
            assert!(!apply_invalid(&mut p, "second", Utc::now()));
            // First reason wins.
            assert_eq!(p.invalid_reason.as_deref(), Some("first"));
        }

        #[test]
        fn overrides_other_states() {
            let mut p = petition_created_at(created());
            p.threshold_reached = true;
            assert!(apply_invalid(&mut p, "gone", Utc::now()));
            assert_eq!(p.status(), crate::types::PetitionStatus::Invalid);
        }
    }
}
