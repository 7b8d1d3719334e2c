use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change in the tracker produces an Event.
/// The CLI prints them; a GUI would render them as notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A goal got its own state and its decay timer started.
    GoalTracked {
        goal_index: usize,
        goal_text: String,
        interval_secs: u64,
        at: DateTime<Utc>,
    },
    /// A cycle elapsed without acknowledgement and a heart was taken.
    HeartLost {
        goal_index: usize,
        goal_text: String,
        hearts: u8,
        at: DateTime<Utc>,
    },
    GoalAcknowledged {
        goal_index: usize,
        hearts: u8,
        previous_hearts: u8,
        at: DateTime<Utc>,
    },
    AcknowledgementUndone {
        goal_index: usize,
        hearts: u8,
        at: DateTime<Utc>,
    },
    GoalCompleted {
        goal_index: usize,
        completed_at: DateTime<Utc>,
    },
    /// A goal and its timer were dropped; later goals shifted down by one.
    GoalRemoved {
        goal_index: usize,
        goal_text: String,
        at: DateTime<Utc>,
    },
    StreakUpdated {
        current_streak: u32,
        longest_streak: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Index of the goal the event refers to, if any.
    pub fn goal_index(&self) -> Option<usize> {
        match self {
            Event::GoalTracked { goal_index, .. }
            | Event::HeartLost { goal_index, .. }
            | Event::GoalAcknowledged { goal_index, .. }
            | Event::AcknowledgementUndone { goal_index, .. }
            | Event::GoalCompleted { goal_index, .. }
            | Event::GoalRemoved { goal_index, .. } => Some(*goal_index),
            Event::StreakUpdated { .. } => None,
        }
    }
}
