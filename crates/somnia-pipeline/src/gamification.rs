// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gamification ledger: XP, level, and consecutive-day streak math.
//!
//! The pure functions here are applied inside the save path (see
//! `journal`). Streak updates take an incremental fast path when the new
//! entry lands on today and the stored state is fresh; every other case
//! (backdated entry, lapsed user, missing state) recomputes from the full
//! set of distinct entry days.

use somnia_core::types::DAY_MS;

/// Fixed XP award per saved entry.
pub const XP_PER_ENTRY: i64 = 10;

/// Epoch-day bucket of a millisecond timestamp.
pub fn day_of(epoch_ms: i64) -> i64 {
    epoch_ms.div_euclid(DAY_MS)
}

/// Apply one entry's XP award and the single-step level-up rule.
///
/// The threshold is `level * 100`; with a fixed +10 award a save can never
/// skip a level, so a single-step check suffices.
pub fn apply_xp(xp: i64, level: i64) -> (i64, i64) {
    let new_xp = xp + XP_PER_ENTRY;
    let next_level_xp = level * 100;
    if new_xp >= next_level_xp {
        (new_xp, level + 1)
    } else {
        (new_xp, level)
    }
}

/// Incremental streak update for the common live-journaling path.
///
/// Returns `None` when the stored state cannot be trusted to extend
/// (backdated entry, lapsed last entry day, zero streak) and the caller
/// must fall back to [`streak_from_days`].
pub fn advance_streak(
    streak: i64,
    last_entry_day: Option<i64>,
    new_day: i64,
    today: i64,
) -> Option<i64> {
    if new_day != today {
        return None;
    }
    match last_entry_day {
        Some(last) if last == today && streak > 0 => Some(streak),
        Some(last) if last == today - 1 && streak > 0 => Some(streak + 1),
        _ => None,
    }
}

/// Full streak recomputation from the distinct entry days.
///
/// `days` must be deduplicated and sorted descending. The streak counts
/// consecutive days ending today or yesterday; anything older yields 0.
pub fn streak_from_days(days: &[i64], today: i64) -> i64 {
    let Some(&latest) = days.first() else {
        return 0;
    };
    if latest < today - 1 {
        return 0;
    }

    let mut streak = 1;
    let mut prev = latest;
    for &day in &days[1..] {
        if day == prev - 1 {
            streak += 1;
            prev = day;
        } else {
            break;
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODAY: i64 = 20_000;

    #[test]
    fn xp_award_is_fixed_ten() {
        let (xp, level) = apply_xp(0, 1);
        assert_eq!(xp, 10);
        assert_eq!(level, 1);
    }

    #[test]
    fn level_up_at_exact_threshold() {
        // Level 1, XP 90: one save reaches 100 = 1 * 100, so level 2.
        let (xp, level) = apply_xp(90, 1);
        assert_eq!(xp, 100);
        assert_eq!(level, 2);
    }

    #[test]
    fn no_level_up_below_threshold() {
        let (xp, level) = apply_xp(150, 2);
        assert_eq!(xp, 160);
        assert_eq!(level, 2, "160 < 200 stays level 2");
    }

    #[test]
    fn day_of_buckets_by_utc_day() {
        assert_eq!(day_of(0), 0);
        assert_eq!(day_of(DAY_MS - 1), 0);
        assert_eq!(day_of(DAY_MS), 1);
        assert_eq!(day_of(100 * DAY_MS + 12_345), 100);
    }

    #[test]
    fn streak_three_consecutive_days() {
        let days = vec![TODAY, TODAY - 1, TODAY - 2];
        assert_eq!(streak_from_days(&days, TODAY), 3);
    }

    #[test]
    fn streak_gap_breaks_the_chain() {
        let days = vec![TODAY, TODAY - 3];
        assert_eq!(streak_from_days(&days, TODAY), 1);
    }

    #[test]
    fn streak_zero_when_latest_is_older_than_yesterday() {
        let days = vec![TODAY - 3];
        assert_eq!(streak_from_days(&days, TODAY), 0);
    }

    #[test]
    fn streak_zero_with_no_entries() {
        assert_eq!(streak_from_days(&[], TODAY), 0);
    }

    #[test]
    fn streak_may_end_yesterday() {
        let days = vec![TODAY - 1, TODAY - 2];
        assert_eq!(streak_from_days(&days, TODAY), 2);
    }

    #[test]
    fn advance_streak_same_day_is_unchanged() {
        assert_eq!(advance_streak(2, Some(TODAY), TODAY, TODAY), Some(2));
    }

    #[test]
    fn advance_streak_yesterday_extends() {
        assert_eq!(advance_streak(2, Some(TODAY - 1), TODAY, TODAY), Some(3));
    }

    #[test]
    fn advance_streak_lapsed_requires_recompute() {
        assert_eq!(advance_streak(5, Some(TODAY - 4), TODAY, TODAY), None);
    }

    #[test]
    fn advance_streak_backdated_entry_requires_recompute() {
        assert_eq!(advance_streak(2, Some(TODAY - 1), TODAY - 10, TODAY), None);
    }

    #[test]
    fn advance_streak_zero_stored_streak_requires_recompute() {
        // A user row created after entries already existed.
        assert_eq!(advance_streak(0, Some(TODAY), TODAY, TODAY), None);
    }

    #[test]
    fn advance_streak_no_prior_entry_requires_recompute() {
        assert_eq!(advance_streak(0, None, TODAY, TODAY), None);
    }

    #[test]
    fn incremental_agrees_with_full_recompute() {
        // Simulate three consecutive daily saves and check both paths agree.
        let mut streak = 0;
        let mut days: Vec<i64> = Vec::new();
        for offset in (0..3).rev() {
            let day = TODAY - offset;
            days.insert(0, day);
            streak = match advance_streak(streak, days.get(1).copied(), day, day) {
                Some(s) => s,
                None => streak_from_days(&days, day),
            };
            assert_eq!(streak, streak_from_days(&days, day));
        }
        assert_eq!(streak, 3);
    }
}
