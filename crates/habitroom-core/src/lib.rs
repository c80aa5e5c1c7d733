//! # Habitroom Core Library
//!
//! This library provides the core logic for the Habitroom habit tracker.
//! Persistence, authentication and realtime change notification live in an
//! external document-store service; this crate is the typed client and the
//! state-binding layer over it. The `habitroom-cli` binary is a thin front end
//! over the same library.
//!
//! ## Architecture
//!
//! - **Streaks**: pure derivation of current/best streak from completion
//!   timestamps, plus the ranked leaderboard
//! - **Backend**: async client for the account, document and realtime APIs
//! - **Session**: explicitly passed authenticated context
//! - **Reconcile**: change events feeding a single-flight refetch task per
//!   collection, bound to a cancellable scope
//!
//! ## Key Components
//!
//! - [`compute_streak`]: the streak calculator
//! - [`rank_by_best_streak`]: leaderboard ordering
//! - [`AppwriteClient`]: HTTP client for the backend service
//! - [`AuthService`]: sign-up, sign-in, restore and sign-out
//! - [`CollectionFeed`]: realtime-driven snapshot of a collection

pub mod backend;
pub mod config;
pub mod error;
pub mod habits;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod streak;

pub use backend::{AccountApi, AppwriteClient, DocumentApi, Query, RealtimeClient, Subscription};
pub use config::{BackendConfig, Config, SyncConfig};
pub use error::{BackendError, ConfigError, CoreError, ValidationError};
pub use habits::HabitService;
pub use models::{Frequency, Habit, HabitCompletion, NewHabit, User};
pub use reconcile::{CollectionFeed, RefetchPolicy, ScreenScope, Snapshot};
pub use session::{AuthService, Session};
pub use streak::{
    compute_streak, habit_streaks, rank_by_best_streak, streak_for_habit, HabitStreak, RankBadge,
    StreakBoard, StreakData,
};
