use std::fmt::Write as _;

use habitroom_core::{
    habit_streaks, rank_by_best_streak, AppwriteClient, HabitService, HabitStreak, RankBadge,
};

use super::{backend_config, require_session, runtime, CliResult};

pub fn run(json: bool) -> CliResult {
    let config = backend_config()?;
    let client = AppwriteClient::new(config.clone());

    runtime()?.block_on(async move {
        let session = require_session(&client).await?;
        let service = HabitService::new(client, &config);
        let habits = service.list_habits(&session).await?;
        let completions = service.list_completions(&session).await?;
        let ranked = rank_by_best_streak(habit_streaks(&habits, &completions));

        if json {
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        } else {
            print!("{}", render(&ranked));
        }
        Ok(())
    })
}

fn badge(badge: RankBadge) -> &'static str {
    match badge {
        RankBadge::First => "🥇",
        RankBadge::Second => "🥈",
        RankBadge::Third => "🥉",
    }
}

/// Leaderboard text: top three with badges, then every habit.
pub fn render(ranked: &[HabitStreak]) -> String {
    let mut out = String::new();
    if ranked.is_empty() {
        out.push_str("No habits yet.\n");
        return out;
    }

    out.push_str("Top Streaks\n");
    for (position, row) in ranked.iter().take(3).enumerate() {
        let mark = RankBadge::for_position(position).map(badge).unwrap_or(" ");
        let _ = writeln!(out, "  {mark} {}  best {} days", row.habit.title, row.best_streak);
    }

    out.push_str("\nAll Habits\n");
    for row in ranked {
        let _ = writeln!(
            out,
            "  {:<24} current {:>3}  best {:>3}  total {:>4}",
            row.habit.title, row.streak, row.best_streak, row.total
        );
    }
    out
}
