pub mod check;
pub mod config;
pub mod goal;
pub mod run;
pub mod status;
pub mod streak;
pub mod user;

use chrono::{DateTime, Utc};
use sheeptrack_core::{
    CompletionPolicy, Config, CoreError, Database, Event, GoalSetCoordinator, GoalStore, User,
};
use tracing::{debug, warn};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

const CURRENT_USER_KEY: &str = "current_user";

/// Everything a command needs for the logged-in user.
///
/// Opening a session takes the database write lock, loads the saved tracker
/// state, lines it up with the stored goals, and applies the decay cycles
/// that ended while nothing was running. The lock is released by
/// [`save`](Self::save), or rolled back if the session is dropped unsaved.
pub struct Session {
    pub config: Config,
    pub db: Database,
    pub user: User,
    pub coordinator: GoalSetCoordinator,
    /// Events produced while catching up on open.
    pub pending: Vec<Event>,
    writing: bool,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Database::open()?.with_tracker_config(&config.tracker);
        let user = current_user(&db)?;

        db.begin_write()?;
        let loaded = load_tracker(&db, user.id, config.completion_policy(), Utc::now());
        let (coordinator, pending) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                db.rollback()?;
                return Err(e.into());
            }
        };

        Ok(Self {
            config,
            db,
            user,
            coordinator,
            pending,
            writing: true,
        })
    }

    /// Store the tracker state and release the write lock.
    pub fn save(mut self) -> CmdResult {
        self.db.save_session(self.user.id, &self.coordinator)?;
        self.db.commit()?;
        self.writing = false;
        Ok(())
    }

    /// Store id of the goal at `index`.
    pub fn goal_id(&self, index: usize) -> Result<i64, Box<dyn std::error::Error>> {
        self.coordinator
            .goal(index)
            .and_then(|g| g.id)
            .ok_or_else(|| format!("no goal at index {index}").into())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.writing {
            if let Err(e) = self.db.rollback() {
                warn!(error = %e, "failed to roll back session");
            }
        }
    }
}

/// Restore the saved tracker for `user_id` and bring it up to `now`.
///
/// Returns the coordinator with the events produced along the way: newly
/// tracked goals and hearts lost since the last save.
pub fn load_tracker(
    db: &Database,
    user_id: i64,
    policy: CompletionPolicy,
    now: DateTime<Utc>,
) -> Result<(GoalSetCoordinator, Vec<Event>), CoreError> {
    let goals = db.fetch_goals_for_user(user_id)?;
    let mut coordinator = db.load_session(user_id)?.unwrap_or_default();
    coordinator.set_policy(policy);

    let mut events = coordinator.realign(&goals, now);
    events.extend(coordinator.tick(now));
    debug!(goals = coordinator.len(), events = events.len(), "tracker loaded");
    Ok((coordinator, events))
}

/// Load, tick and save the stored tracker in one locked step.
pub fn tick_stored(
    db: &Database,
    user_id: i64,
    policy: CompletionPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, CoreError> {
    db.begin_write()?;
    let result = load_tracker(db, user_id, policy, now).and_then(|(coordinator, events)| {
        db.save_session(user_id, &coordinator)?;
        Ok(events)
    });
    match result {
        Ok(events) => {
            db.commit()?;
            Ok(events)
        }
        Err(e) => {
            db.rollback()?;
            Err(e)
        }
    }
}

pub fn current_user(db: &Database) -> Result<User, Box<dyn std::error::Error>> {
    let id = db
        .kv_get(CURRENT_USER_KEY)?
        .ok_or("not logged in (run `sheeptrack user login <name>`)")?;
    let id: i64 = id.parse()?;
    Ok(db.user_by_id(id)?)
}

pub fn set_current_user(db: &Database, user: &User) -> CmdResult {
    db.kv_set(CURRENT_USER_KEY, &user.id.to_string())?;
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
