//! Streak statistics for habits.
//!
//! A streak is a run of completions with no gap longer than one day between
//! consecutive entries. Everything here is derived from the raw completion
//! list; nothing is stored.
//!
//! - [`compute_streak`]: current streak, best streak and total for one habit
//! - [`ranking`]: leaderboard ordering by best streak
//! - [`board`]: version-keyed memo of the ranked leaderboard

mod board;
mod ranking;

pub use board::StreakBoard;
pub use ranking::{habit_streaks, rank_by_best_streak, HabitStreak, RankBadge};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::HabitCompletion;

/// Fixed-length day. Calendar arithmetic would shift across DST changes.
const MS_PER_DAY: f64 = 86_400_000.0;

/// Streak figures for a single habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakData {
    /// Length of the run ending at the most recent completion.
    pub streak: u32,
    /// Longest run across all completions.
    pub best_streak: u32,
    /// Number of completions.
    pub total: u32,
}

/// Compute streak figures from one habit's completions, in any order.
pub fn compute_streak(completions: &[HabitCompletion]) -> StreakData {
    streak_from_timestamps(completions.iter().map(|c| c.completed_at))
}

/// Compute streak figures for `habit_id` out of a mixed completion list.
pub fn streak_for_habit(habit_id: &str, completions: &[HabitCompletion]) -> StreakData {
    streak_from_timestamps(
        completions
            .iter()
            .filter(|c| c.habit_id == habit_id)
            .map(|c| c.completed_at),
    )
}

/// Core calculation over bare timestamps.
///
/// Two completions continue a streak when they are at most one day apart,
/// which includes completions on the same day or at the same instant. The
/// `streak` field is the run ending at the latest completion, whether or not
/// that completion is recent.
pub fn streak_from_timestamps<I>(timestamps: I) -> StreakData
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut sorted: Vec<DateTime<Utc>> = timestamps.into_iter().collect();
    if sorted.is_empty() {
        return StreakData::default();
    }
    sorted.sort();

    let mut current: u32 = 0;
    let mut best: u32 = 0;
    let mut last: Option<DateTime<Utc>> = None;

    for at in &sorted {
        current = match last {
            Some(prev) => {
                // Truncate each side to whole milliseconds before subtracting.
                let diff_ms = at.timestamp_millis() - prev.timestamp_millis();
                let diff_days = diff_ms as f64 / MS_PER_DAY;
                if diff_days <= 1.0 {
                    current + 1
                } else {
                    1
                }
            }
            None => 1,
        };
        best = best.max(current);
        last = Some(*at);
    }

    StreakData {
        streak: current,
        best_streak: best,
        total: sorted.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::days(n - 1)
    }

    fn completion(id: &str, habit_id: &str, at: DateTime<Utc>) -> HabitCompletion {
        HabitCompletion {
            id: id.to_string(),
            habit_id: habit_id.to_string(),
            user_id: "u1".to_string(),
            completed_at: at,
        }
    }

    fn data(streak: u32, best_streak: u32, total: u32) -> StreakData {
        StreakData {
            streak,
            best_streak,
            total,
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(compute_streak(&[]), data(0, 0, 0));
    }

    #[test]
    fn single_completion() {
        let c = [completion("c1", "h1", day(1))];
        assert_eq!(compute_streak(&c), data(1, 1, 1));
    }

    #[test]
    fn consecutive_days() {
        let c = [
            completion("c1", "h1", day(1)),
            completion("c2", "h1", day(2)),
            completion("c3", "h1", day(3)),
        ];
        assert_eq!(compute_streak(&c), data(3, 3, 3));
    }

    #[test]
    fn gap_breaks_current_but_keeps_best() {
        let c = [
            completion("c1", "h1", day(1)),
            completion("c2", "h1", day(2)),
            completion("c3", "h1", day(5)),
        ];
        assert_eq!(compute_streak(&c), data(1, 2, 3));
    }

    #[test]
    fn same_day_completions_continue_and_are_counted() {
        let c = [
            completion("c1", "h1", day(1)),
            completion("c2", "h1", day(1) + Duration::hours(3)),
        ];
        assert_eq!(compute_streak(&c), data(2, 2, 2));
    }

    #[test]
    fn identical_instants_continue_the_streak() {
        let c = [completion("c1", "h1", day(1)), completion("c2", "h1", day(1))];
        assert_eq!(compute_streak(&c), data(2, 2, 2));
    }

    #[test]
    fn exactly_one_day_apart_continues() {
        let ts = [day(1), day(1) + Duration::milliseconds(86_400_000)];
        assert_eq!(streak_from_timestamps(ts), data(2, 2, 2));
    }

    #[test]
    fn sub_millisecond_parts_are_truncated_per_timestamp() {
        let first = day(1) + Duration::microseconds(900);
        let second = first + Duration::milliseconds(86_400_000) + Duration::microseconds(200);
        // 0.9 ms and 86 400 001.1 ms truncate to a gap of 86 400 001 ms.
        assert_eq!(streak_from_timestamps([first, second]), data(1, 1, 2));

        let within = day(1) + Duration::microseconds(100);
        let edge = day(1) + Duration::milliseconds(86_400_000) + Duration::microseconds(900);
        assert_eq!(streak_from_timestamps([within, edge]), data(2, 2, 2));
    }

    #[test]
    fn one_millisecond_over_a_day_breaks() {
        let ts = [day(1), day(1) + Duration::milliseconds(86_400_001)];
        assert_eq!(streak_from_timestamps(ts), data(1, 1, 2));
    }

    #[test]
    fn terminal_run_is_reported_even_when_old() {
        // Best run of three early on, then a later run of two.
        let ts = [day(1), day(2), day(3), day(10), day(11)];
        assert_eq!(streak_from_timestamps(ts), data(2, 3, 5));
    }

    #[test]
    fn out_of_order_input_is_sorted_first() {
        let sorted = [
            completion("c1", "h1", day(1)),
            completion("c2", "h1", day(2)),
            completion("c3", "h1", day(5)),
        ];
        let shuffled = [sorted[2].clone(), sorted[0].clone(), sorted[1].clone()];
        assert_eq!(compute_streak(&shuffled), compute_streak(&sorted));
    }

    #[test]
    fn streak_for_habit_ignores_other_habits() {
        let c = [
            completion("c1", "h1", day(1)),
            completion("c2", "h2", day(2)),
            completion("c3", "h1", day(2)),
            completion("c4", "h2", day(9)),
        ];
        assert_eq!(streak_for_habit("h1", &c), data(2, 2, 2));
        assert_eq!(streak_for_habit("h2", &c), data(1, 1, 2));
        assert_eq!(streak_for_habit("missing", &c), data(0, 0, 0));
    }

    proptest! {
        #[test]
        fn result_is_independent_of_input_order(
            offsets in prop::collection::vec(0i64..5_000_000, 0..40),
            seed in any::<u64>(),
        ) {
            let base = day(1);
            let ts: Vec<_> = offsets.iter().map(|m| base + Duration::minutes(*m)).collect();

            let mut rotated = ts.clone();
            if !rotated.is_empty() {
                let k = (seed as usize) % rotated.len();
                rotated.rotate_left(k);
                rotated.reverse();
            }

            prop_assert_eq!(streak_from_timestamps(ts.clone()), streak_from_timestamps(rotated));
        }

        #[test]
        fn best_bounds_current_and_total(
            offsets in prop::collection::vec(0i64..200_000, 1..40),
        ) {
            let base = day(1);
            let result =
                streak_from_timestamps(offsets.iter().map(|m| base + Duration::minutes(*m)));
            prop_assert!(result.streak >= 1);
            prop_assert!(result.streak <= result.best_streak);
            prop_assert!(result.best_streak <= result.total);
            prop_assert_eq!(result.total as usize, offsets.len());
        }
    }
}
