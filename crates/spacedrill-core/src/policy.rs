//! Review policy: a simplified SM-2 over four recall tiers.
//!
//! | quality | interval                               | ease    | status   |
//! |---------|----------------------------------------|---------|----------|
//! | forgot  | 1 day                                  | -0.20   | learning |
//! | hard    | 2 days                                 | -0.15   | learning |
//! | good    | max(5, floor(interval * ease))         | +0      | review   |
//! | easy    | max(7, floor(interval * ease * 1.3))   | +0.15   | review   |
//!
//! The ease adjustment for "easy" applies after the interval is computed.

use chrono::{DateTime, Days, Utc};

use crate::error::SchedulingError;
use crate::model::{Quality, ReviewStatus, SchedulingState, MIN_EASE_FACTOR};

/// Longest interval the policy will schedule (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

const FORGOT_INTERVAL_DAYS: u32 = 1;
const HARD_INTERVAL_DAYS: u32 = 2;
const GOOD_MIN_INTERVAL_DAYS: u32 = 5;
const EASY_MIN_INTERVAL_DAYS: u32 = 7;
const EASY_BONUS: f64 = 1.3;

const FORGOT_EASE_PENALTY: f64 = 0.2;
const HARD_EASE_PENALTY: f64 = 0.15;
const EASY_EASE_BONUS: f64 = 0.15;

/// Compute the scheduling state that follows a review.
///
/// `prior == None` is treated as a never-reviewed item (ease 2.5, interval 0,
/// status new). Pure: persisting the result is the caller's job.
pub fn apply_review(
    user_id: &str,
    item_id: &str,
    prior: Option<&SchedulingState>,
    quality: Quality,
    now: DateTime<Utc>,
) -> SchedulingState {
    let base = match prior {
        Some(state) => state.clone(),
        None => SchedulingState::fresh(user_id, item_id, now),
    };

    let ease = base.ease_factor.max(MIN_EASE_FACTOR);
    let (interval_days, ease_factor, status) = match quality {
        Quality::Forgot => (
            FORGOT_INTERVAL_DAYS,
            lower_ease(ease, FORGOT_EASE_PENALTY),
            ReviewStatus::Learning,
        ),
        Quality::Hard => (
            HARD_INTERVAL_DAYS,
            lower_ease(ease, HARD_EASE_PENALTY),
            ReviewStatus::Learning,
        ),
        Quality::Good => (
            grow_interval(base.interval_days, ease, GOOD_MIN_INTERVAL_DAYS),
            ease,
            ReviewStatus::Review,
        ),
        Quality::Easy => (
            grow_interval(base.interval_days, ease * EASY_BONUS, EASY_MIN_INTERVAL_DAYS),
            ease + EASY_EASE_BONUS,
            ReviewStatus::Review,
        ),
    };

    SchedulingState {
        user_id: user_id.to_string(),
        item_id: item_id.to_string(),
        ease_factor,
        interval_days,
        review_count: base.review_count.saturating_add(1),
        status,
        next_due_at: due_after(now, interval_days),
        last_reviewed_at: Some(now),
    }
}

/// [`apply_review`] for an unchecked quality value.
pub fn apply_review_raw(
    user_id: &str,
    item_id: &str,
    prior: Option<&SchedulingState>,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<SchedulingState, SchedulingError> {
    let quality = Quality::try_from(quality)?;
    Ok(apply_review(user_id, item_id, prior, quality, now))
}

fn lower_ease(ease: f64, penalty: f64) -> f64 {
    (ease - penalty).max(MIN_EASE_FACTOR)
}

fn grow_interval(current: u32, factor: f64, minimum: u32) -> u32 {
    let grown = (f64::from(current) * factor).floor();
    if grown >= f64::from(MAX_INTERVAL_DAYS) {
        MAX_INTERVAL_DAYS
    } else {
        (grown as u32).max(minimum)
    }
}

/// `now` plus whole calendar days.
fn due_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn state(interval: u32, ease: f64, count: u32) -> SchedulingState {
        SchedulingState {
            interval_days: interval,
            ease_factor: ease,
            review_count: count,
            status: ReviewStatus::Review,
            ..SchedulingState::fresh("u", "w", now())
        }
    }

    #[test]
    fn first_review_forgot() {
        let s = apply_review("u", "w", None, Quality::Forgot, now());
        assert_eq!(s.interval_days, 1);
        assert!((s.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(s.status, ReviewStatus::Learning);
        assert_eq!(s.review_count, 1);
        assert_eq!(s.next_due_at, Utc.with_ymd_and_hms(2024, 6, 2, 9, 30, 0).unwrap());
        assert_eq!(s.last_reviewed_at, Some(now()));
    }

    #[test]
    fn first_review_hard() {
        let s = apply_review("u", "w", None, Quality::Hard, now());
        assert_eq!(s.interval_days, 2);
        assert!((s.ease_factor - 2.35).abs() < 1e-9);
        assert_eq!(s.status, ReviewStatus::Learning);
    }

    #[test]
    fn first_review_good_and_easy_use_minimums() {
        let good = apply_review("u", "w", None, Quality::Good, now());
        assert_eq!(good.interval_days, 5);
        assert!((good.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(good.status, ReviewStatus::Review);

        let easy = apply_review("u", "w", None, Quality::Easy, now());
        assert_eq!(easy.interval_days, 7);
        assert!((easy.ease_factor - 2.65).abs() < 1e-9);
        assert_eq!(easy.next_due_at, Utc.with_ymd_and_hms(2024, 6, 8, 9, 30, 0).unwrap());
    }

    #[test]
    fn good_multiplies_by_ease() {
        let s = apply_review("u", "w", Some(&state(10, 2.5, 3)), Quality::Good, now());
        assert_eq!(s.interval_days, 25);
        assert_eq!(s.review_count, 4);
    }

    #[test]
    fn easy_uses_old_ease_with_bonus() {
        // floor(10 * 2.0 * 1.3) = 26, ease then rises to 2.15
        let s = apply_review("u", "w", Some(&state(10, 2.0, 1)), Quality::Easy, now());
        assert_eq!(s.interval_days, 26);
        assert!((s.ease_factor - 2.15).abs() < 1e-9);
    }

    #[test]
    fn good_below_minimum_jumps_to_five() {
        let s = apply_review("u", "w", Some(&state(2, 2.5, 1)), Quality::Good, now());
        assert_eq!(s.interval_days, 5);
    }

    #[test]
    fn good_from_short_interval_still_multiplies() {
        // floor(3 * 2.5) = 7, above the minimum of 5
        let s = apply_review("u", "w", Some(&state(3, 2.5, 2)), Quality::Good, now());
        assert_eq!(s.interval_days, 7);
    }

    #[test]
    fn easy_after_first_good_grows_from_five() {
        let good = apply_review("u", "w", None, Quality::Good, now());
        // floor(5 * 2.5 * 1.3) = 16
        let easy = apply_review("u", "w", Some(&good), Quality::Easy, now());
        assert_eq!(easy.interval_days, 16);
        assert_eq!(easy.next_due_at, Utc.with_ymd_and_hms(2024, 6, 17, 9, 30, 0).unwrap());
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let mut current: Option<SchedulingState> = None;
        for i in 0..50 {
            let q = if i % 2 == 0 { Quality::Forgot } else { Quality::Hard };
            let next = apply_review("u", "w", current.as_ref(), q, now());
            assert!(next.ease_factor >= MIN_EASE_FACTOR, "ease fell to {}", next.ease_factor);
            current = Some(next);
        }
        let settled = current.unwrap();
        assert!((settled.ease_factor - MIN_EASE_FACTOR).abs() < 1e-9);
        assert_eq!(settled.review_count, 50);
    }

    #[test]
    fn review_count_increments_by_one_for_every_quality() {
        for prior in [None, Some(state(0, 2.5, 0)), Some(state(40, 1.3, 17))] {
            for q in Quality::ALL {
                let before = prior.as_ref().map(|s| s.review_count).unwrap_or(0);
                let s = apply_review("u", "w", prior.as_ref(), q, now());
                assert_eq!(s.review_count, before + 1);
            }
        }
    }

    #[test]
    fn next_due_is_strictly_after_now() {
        for prior in [None, Some(state(0, 1.3, 2)), Some(state(365, 3.0, 9))] {
            for q in Quality::ALL {
                let s = apply_review("u", "w", prior.as_ref(), q, now());
                assert!(s.next_due_at > now(), "{q} scheduled at {}", s.next_due_at);
                assert!(s.interval_days >= 1);
            }
        }
    }

    #[test]
    fn repeated_easy_is_capped() {
        let mut current = state(7, 2.5, 0);
        for _ in 0..40 {
            current = apply_review("u", "w", Some(&current), Quality::Easy, now());
        }
        assert_eq!(current.interval_days, MAX_INTERVAL_DAYS);
        assert!(current.next_due_at > now());
    }

    #[test]
    fn raw_quality_is_validated() {
        assert!(matches!(
            apply_review_raw("u", "w", None, 4, now()),
            Err(SchedulingError::InvalidQuality(4))
        ));
        let s = apply_review_raw("u", "w", None, 2, now()).unwrap();
        assert_eq!(s.interval_days, 5);
    }

    #[test]
    fn identifiers_come_from_arguments() {
        let s = apply_review("alice", "word-9", None, Quality::Good, now());
        assert_eq!(s.user_id, "alice");
        assert_eq!(s.item_id, "word-9");
    }
}
