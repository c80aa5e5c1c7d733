//! Memoized leaderboard keyed on snapshot versions.

use super::{habit_streaks, rank_by_best_streak, HabitStreak};
use crate::models::{Habit, HabitCompletion};
use crate::reconcile::Snapshot;

/// Ranked leaderboard derived from a habits snapshot and a completions
/// snapshot. Recomputed only when either snapshot version changes.
#[derive(Debug, Default)]
pub struct StreakBoard {
    key: Option<(u64, u64)>,
    ranked: Vec<HabitStreak>,
    computations: u64,
}

impl StreakBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranked rows for the given snapshots.
    pub fn ranked(
        &mut self,
        habits: &Snapshot<Habit>,
        completions: &Snapshot<HabitCompletion>,
    ) -> &[HabitStreak] {
        let key = (habits.version, completions.version);
        if self.key != Some(key) {
            self.ranked = rank_by_best_streak(habit_streaks(&habits.items, &completions.items));
            self.key = Some(key);
            self.computations += 1;
        }
        &self.ranked
    }

    /// How many times the ranking has been recomputed.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}
