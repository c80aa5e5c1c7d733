use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use habitroom_core::{
    AppwriteClient, CollectionFeed, Config, HabitService, RealtimeClient, RefetchPolicy,
    ScreenScope, StreakBoard,
};
use tokio::sync::mpsc;

use super::streaks::render;
use super::{require_session, runtime, CliResult};

const EVENT_BUFFER: usize = 64;

/// Live leaderboard until Ctrl-C.
pub fn run() -> CliResult {
    let config = Config::load()?;
    let backend = config.backend()?;
    let debounce = Duration::from_millis(config.sync.debounce_ms);
    let client = AppwriteClient::new(backend.clone());

    runtime()?.block_on(async move {
        let session = Arc::new(require_session(&client).await?);
        let service = Arc::new(HabitService::new(client, &backend));
        let realtime = RealtimeClient::new(backend.clone());
        let scope = ScreenScope::new();

        let (habit_events, habit_rx) = mpsc::channel(EVENT_BUFFER);
        let (completion_events, completion_rx) = mpsc::channel(EVENT_BUFFER);
        let habit_sub = realtime
            .subscribe(vec![backend.habits_channel()], Some(session.secret()), habit_events)
            .await?;
        let completion_sub = realtime
            .subscribe(
                vec![backend.completions_channel()],
                Some(session.secret()),
                completion_events,
            )
            .await?;

        let habits_feed = {
            let (service, session) = (service.clone(), session.clone());
            CollectionFeed::spawn(
                "habits",
                move || {
                    let (service, session) = (service.clone(), session.clone());
                    async move { service.list_habits(&session).await }
                },
                habit_rx,
                RefetchPolicy::all(),
                debounce,
                scope.clone(),
            )
        };
        let completions_feed = {
            let (service, session) = (service.clone(), session.clone());
            CollectionFeed::spawn(
                "completions",
                move || {
                    let (service, session) = (service.clone(), session.clone());
                    async move { service.list_completions(&session).await }
                },
                completion_rx,
                RefetchPolicy::all(),
                debounce,
                scope.clone(),
            )
        };

        let mut habits = habits_feed.subscribe();
        let mut completions = completions_feed.subscribe();
        let mut board = StreakBoard::new();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        eprintln!("watching for changes, Ctrl-C to stop");
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                changed = habits.changed() => if changed.is_err() { break },
                changed = completions.changed() => if changed.is_err() { break },
            }

            let habits_now = habits.borrow_and_update().clone();
            let completions_now = completions.borrow_and_update().clone();
            if habits_now.is_loaded() && completions_now.is_loaded() {
                println!("--- {} ---", Local::now().format("%H:%M:%S"));
                print!("{}", render(board.ranked(&habits_now, &completions_now)));
            }
        }

        scope.cancel();
        habit_sub.unsubscribe();
        completion_sub.unsubscribe();
        habits_feed.join().await;
        completions_feed.join().await;
        tracing::debug!(recomputed = board.computations(), "watch stopped");
        Ok(())
    })
}
