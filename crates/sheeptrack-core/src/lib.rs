//! # SheepTrack Core Library
//!
//! Core logic for SheepTrack, a goal tracker where every goal is looked
//! after by a virtual sheep. The sheep has three hearts; it loses one each
//! decay cycle the user fails to check in and gains one back on check-in.
//! All operations are available through the standalone `sheeptrack` CLI.
//!
//! ## Architecture
//!
//! - **Tracker**: a wall-clock state machine. Nothing sleeps inside it; the
//!   caller passes `now` to [`GoalSetCoordinator::tick`], or hands the
//!   coordinator to a [`DecayDriver`] to poll it on a tokio interval
//! - **Storage**: SQLite for users, goals and saved sessions, TOML for
//!   configuration
//! - **Streaks**: consecutive check-in days per user
//!
//! ## Key Components
//!
//! - [`GoalSetCoordinator`]: per-goal heart state and decay timers
//! - [`CheckInController`]: acknowledge, undo and complete transitions
//! - [`Database`]: the [`GoalStore`] backed by SQLite
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod goal;
pub mod storage;
pub mod streak;
pub mod tracker;

pub use error::{ConfigError, CoreError, DatabaseError, TrackerError, ValidationError};
pub use events::Event;
pub use goal::{Frequency, Goal, GoalState, PetMood, MAX_HEARTS};
pub use storage::{Config, Database, GoalStore, IntervalConfig, TrackerConfig, User};
pub use streak::StreakRecord;
pub use tracker::{
    ArchivedGoal, CheckInController, CompletionPolicy, DecayDriver, DecayScheduler,
    GoalSetCoordinator, GoalSnapshot, Summary,
};
