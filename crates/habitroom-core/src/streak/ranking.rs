//! Leaderboard ordering by best streak.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use super::{streak_for_habit, StreakData};
use crate::models::{Habit, HabitCompletion};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStreak {
    pub habit: Habit,
    pub streak: u32,
    pub best_streak: u32,
    pub total: u32,
}

impl HabitStreak {
    pub fn new(habit: Habit, data: StreakData) -> Self {
        Self {
            habit,
            streak: data.streak,
            best_streak: data.best_streak,
            total: data.total,
        }
    }
}

/// Badge shown next to the top three rows. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBadge {
    First,
    Second,
    Third,
}

impl RankBadge {
    /// Badge for a zero-based leaderboard position.
    pub fn for_position(position: usize) -> Option<Self> {
        match position {
            0 => Some(RankBadge::First),
            1 => Some(RankBadge::Second),
            2 => Some(RankBadge::Third),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            RankBadge::First => 1,
            RankBadge::Second => 2,
            RankBadge::Third => 3,
        }
    }
}

/// Build one row per habit, keeping the habits' order.
pub fn habit_streaks(habits: &[Habit], completions: &[HabitCompletion]) -> Vec<HabitStreak> {
    habits
        .iter()
        .map(|habit| HabitStreak::new(habit.clone(), streak_for_habit(&habit.id, completions)))
        .collect()
}

/// Sort rows by best streak, highest first. Equal best streaks keep their
/// input order.
pub fn rank_by_best_streak(mut rows: Vec<HabitStreak>) -> Vec<HabitStreak> {
    // slice::sort_by_key is stable
    rows.sort_by_key(|row| Reverse(row.best_streak));
    rows
}
