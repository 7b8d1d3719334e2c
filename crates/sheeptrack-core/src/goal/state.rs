use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full health. Hearts never rise above this.
pub const MAX_HEARTS: u8 = 3;

/// Tracking state for one goal.
///
/// Plain data: the transitions live in `CheckInController` (user actions)
/// and `DecayScheduler` (elapsed cycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalState {
    /// 0..=3, where 0 means the sheep is dead.
    pub hearts: u8,
    /// Progress confirmed within the current cycle.
    pub acknowledged_today: bool,
    /// Hearts before the most recent acknowledgement, restored on undo.
    pub previous_hearts: u8,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GoalState {
    pub fn new() -> Self {
        Self {
            hearts: MAX_HEARTS,
            acknowledged_today: false,
            previous_hearts: MAX_HEARTS,
            completed: false,
            completed_at: None,
        }
    }

    /// State for a goal that was already finished before tracking began.
    pub fn completed_at(at: DateTime<Utc>) -> Self {
        Self {
            completed: true,
            completed_at: Some(at),
            ..Self::new()
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hearts == 0
    }
}

impl Default for GoalState {
    fn default() -> Self {
        Self::new()
    }
}
