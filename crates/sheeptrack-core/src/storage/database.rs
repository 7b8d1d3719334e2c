//! SQLite-based storage for users, goals and tracker sessions.
//!
//! Provides persistent storage for:
//! - Users (login-or-register by name)
//! - Goals, with the live-goal cap enforced on creation
//! - Key-value store holding per-user tracker sessions and streaks

use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::TrackerConfig;
use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::goal::{Frequency, Goal};
use crate::streak::StreakRecord;
use crate::tracker::GoalSetCoordinator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// What the tracker needs from whoever owns the goal records.
pub trait GoalStore {
    /// Goals for `user_id` in creation order, completed ones included.
    fn fetch_goals_for_user(&self, user_id: i64) -> Result<Vec<Goal>>;

    fn save_goal_completion(&self, goal_id: i64, completed_at: DateTime<Utc>) -> Result<()>;

    /// Insert a goal, refusing it if the user is at the live-goal cap.
    fn create_goal(&self, user_id: i64, goal: &Goal) -> Result<Goal>;

    /// Change what a goal says and when it is due. Its frequency is fixed.
    fn update_goal(&self, goal_id: i64, text: &str, deadline: Option<NaiveDate>) -> Result<()>;

    fn delete_goal(&self, goal_id: i64) -> Result<()>;
}

/// SQLite database for users and goals.
pub struct Database {
    conn: Connection,
    max_live_goals: usize,
    default_deadline_days: u32,
}

impl Database {
    /// Open the database at `<data dir>/sheeptrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("sheeptrack.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        let defaults = TrackerConfig::default();
        Ok(Self {
            conn,
            max_live_goals: defaults.max_live_goals,
            default_deadline_days: defaults.default_deadline_days,
        })
    }

    /// Apply the goal cap and default deadline from configuration.
    pub fn with_tracker_config(mut self, tracker: &TrackerConfig) -> Self {
        self.max_live_goals = tracker.max_live_goals;
        self.default_deadline_days = tracker.default_deadline_days;
        self
    }

    // ── Transactions ─────────────────────────────────────────────────

    /// Take the write lock until [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback).
    ///
    /// Every read-modify-write of a session happens under this lock, so two
    /// processes never save over each other's changes. Waits up to the busy
    /// timeout for another writer before failing with `Locked`.
    pub fn begin_write(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Return the user called `user_name`, creating it on first login.
    pub fn login_or_register(&self, user_name: &str) -> Result<User> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(ValidationError::EmptyText("user name").into());
        }

        if let Some(user) = self.user_by_name(user_name)? {
            debug!(user_id = user.id, "user logged in");
            return Ok(user);
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO users (user_name, created_at) VALUES (?1, ?2)",
            params![user_name, created_at.to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(user_id = id, user_name, "registered new user");
        Ok(User {
            id,
            user_name: user_name.to_string(),
            created_at,
        })
    }

    pub fn user_by_name(&self, user_name: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_name, created_at FROM users WHERE user_name = ?1",
                params![user_name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, user_name, created_at)| {
            Ok(User {
                id,
                user_name,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    pub fn user_by_id(&self, user_id: i64) -> Result<User> {
        let (user_name, created_at) = self
            .conn
            .query_row(
                "SELECT user_name, created_at FROM users WHERE id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or(DatabaseError::NotFound {
                entity: "user",
                id: user_id,
            })?;
        Ok(User {
            id: user_id,
            user_name,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    // ── Goals ────────────────────────────────────────────────────────

    pub fn live_goal_count(&self, user_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM goals WHERE user_id = ?1 AND completed = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Store the tracker state for `user_id`.
    pub fn save_session(&self, user_id: i64, coordinator: &GoalSetCoordinator) -> Result<()> {
        let json = serde_json::to_string(coordinator)?;
        self.kv_set(&session_key(user_id), &json)
    }

    /// Restore the tracker state saved for `user_id`, if any.
    pub fn load_session(&self, user_id: i64) -> Result<Option<GoalSetCoordinator>> {
        match self.kv_get(&session_key(user_id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_streak(&self, user_id: i64, record: &StreakRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.kv_set(&streak_key(user_id), &json)
    }

    pub fn load_streak(&self, user_id: i64) -> Result<StreakRecord> {
        match self.kv_get(&streak_key(user_id))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(StreakRecord::default()),
        }
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl GoalStore for Database {
    fn fetch_goals_for_user(&self, user_id: i64) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, frequency, interval_secs, deadline, completed, completed_at
             FROM goals
             WHERE user_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(GoalRow {
                id: row.get(0)?,
                text: row.get(1)?,
                frequency: row.get(2)?,
                interval_secs: row.get(3)?,
                deadline: row.get(4)?,
                completed: row.get(5)?,
                completed_at: row.get(6)?,
            })
        })?;

        let mut goals = Vec::new();
        for row in rows {
            goals.push(row?.into_goal()?);
        }
        Ok(goals)
    }

    fn save_goal_completion(&self, goal_id: i64, completed_at: DateTime<Utc>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals SET completed = 1, completed_at = ?2 WHERE id = ?1",
            params![goal_id, completed_at.to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "goal",
                id: goal_id,
            }
            .into());
        }
        Ok(())
    }

    fn create_goal(&self, user_id: i64, goal: &Goal) -> Result<Goal> {
        if goal.text.trim().is_empty() {
            return Err(ValidationError::EmptyText("goal text").into());
        }
        let live = self.live_goal_count(user_id)?;
        if !goal.completed && live >= self.max_live_goals {
            return Err(ValidationError::CapacityExceeded {
                user_id,
                live,
                limit: self.max_live_goals,
            }
            .into());
        }

        let now = Utc::now();
        let deadline = match goal.deadline {
            Some(deadline) => deadline,
            None => Duration::try_days(self.default_deadline_days as i64)
                .and_then(|days| now.checked_add_signed(days))
                .map(|at| at.date_naive())
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "default_deadline_days".into(),
                    message: format!("{} days is out of range", self.default_deadline_days),
                })?,
        };

        self.conn.execute(
            "INSERT INTO goals (user_id, text, frequency, interval_secs, deadline, completed, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                goal.text.trim(),
                goal.frequency.as_str(),
                goal.interval_secs as i64,
                deadline.format("%Y-%m-%d").to_string(),
                goal.completed,
                goal.completed_at.map(|at| at.to_rfc3339()),
                now.to_rfc3339(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(user_id, goal_id = id, "goal created");
        Ok(Goal {
            id: Some(id),
            text: goal.text.trim().to_string(),
            deadline: Some(deadline),
            ..goal.clone()
        })
    }

    fn update_goal(&self, goal_id: i64, text: &str, deadline: Option<NaiveDate>) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText("goal text").into());
        }
        let changed = self.conn.execute(
            "UPDATE goals SET text = ?2, deadline = ?3 WHERE id = ?1",
            params![
                goal_id,
                text,
                deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "goal",
                id: goal_id,
            }
            .into());
        }
        info!(goal_id, "goal updated");
        Ok(())
    }

    fn delete_goal(&self, goal_id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![goal_id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "goal",
                id: goal_id,
            }
            .into());
        }
        info!(goal_id, "goal deleted");
        Ok(())
    }
}

struct GoalRow {
    id: i64,
    text: String,
    frequency: String,
    interval_secs: i64,
    deadline: Option<String>,
    completed: bool,
    completed_at: Option<String>,
}

impl GoalRow {
    fn into_goal(self) -> Result<Goal> {
        let frequency: Frequency = self
            .frequency
            .parse()
            .map_err(|e: ValidationError| DatabaseError::QueryFailed(e.to_string()))?;
        let deadline = self
            .deadline
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|e| DatabaseError::QueryFailed(format!("bad deadline '{d}': {e}")))
            })
            .transpose()?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Goal {
            id: Some(self.id),
            text: self.text,
            frequency,
            interval_secs: self.interval_secs.max(0) as u64,
            deadline,
            completed: self.completed,
            completed_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")).into())
}

const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

fn session_key(user_id: i64) -> String {
    format!("session:{user_id}")
}

fn streak_key(user_id: i64) -> String {
    format!("streak:{user_id}")
}
