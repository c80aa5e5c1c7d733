use clap::Subcommand;
use habitroom_core::{streak_for_habit, AppwriteClient, Frequency, HabitService, NewHabit};

use super::{backend_config, require_session, runtime, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Add {
        /// Habit title
        title: String,
        /// What the habit involves
        #[arg(long, short)]
        description: String,
        /// daily, weekly or monthly
        #[arg(long, short, default_value = "daily")]
        frequency: Frequency,
    },
    /// List habits with their current streak
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a habit as done now
    Complete {
        /// Habit ID
        id: String,
    },
    /// Delete a habit
    Delete {
        /// Habit ID
        id: String,
    },
}

pub fn run(action: HabitAction) -> CliResult {
    let config = backend_config()?;
    let client = AppwriteClient::new(config.clone());

    runtime()?.block_on(async move {
        let session = require_session(&client).await?;
        let service = HabitService::new(client, &config);

        match action {
            HabitAction::Add {
                title,
                description,
                frequency,
            } => {
                let habit = service
                    .create_habit(&session, NewHabit::new(title, description, frequency))
                    .await?;
                println!("Habit created: {} ({})", habit.title, habit.id);
            }
            HabitAction::List { json } => {
                let habits = service.list_habits(&session).await?;
                let completions = service.list_completions(&session).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&habits)?);
                } else if habits.is_empty() {
                    println!("No habits yet. Add one with `habitroom-cli habit add`.");
                } else {
                    for habit in &habits {
                        let data = streak_for_habit(&habit.id, &completions);
                        println!(
                            "{}  {} [{}]  {} day streak",
                            habit.id,
                            habit.title,
                            habit.frequency.label(),
                            data.streak
                        );
                        println!("    {}", habit.description);
                    }
                }
            }
            // Completion and deletion failures are logged, not surfaced.
            HabitAction::Complete { id } => match service.complete_habit(&session, &id).await {
                Ok(completion) => println!(
                    "Completed {} at {}",
                    completion.habit_id,
                    completion.completed_at.format("%Y-%m-%d %H:%M")
                ),
                Err(e) => tracing::warn!(habit = %id, error = %e, "failed to complete habit"),
            },
            HabitAction::Delete { id } => {
                match service.delete_habit(&session, &id).await {
                    Ok(()) => println!("Habit deleted: {id}"),
                    Err(e) => tracing::warn!(habit = %id, error = %e, "failed to delete habit"),
                }
            }
        }
        Ok(())
    })
}
