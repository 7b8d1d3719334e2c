//! Goal definitions supplied to the tracker.
//!
//! A [`Goal`] is owned by the persistence layer and handed to the tracker as
//! a single structured record. The tracker keeps its own [`GoalState`] per
//! goal; the only thing it records on the definition is completion.

mod mood;
mod state;

pub use mood::PetMood;
pub use state::{GoalState, MAX_HEARTS};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::IntervalConfig;

/// How often the user intends to work on a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Biweekly];

    /// Cycle length for this frequency.
    pub fn interval(&self, intervals: &IntervalConfig) -> Duration {
        secs_to_duration(intervals.secs_for(*self))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            other => Err(ValidationError::InvalidValue {
                field: "frequency".into(),
                message: format!("'{other}' is not one of daily, weekly, biweekly"),
            }),
        }
    }
}

/// A goal as supplied by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Row id in the goal store; `None` until saved.
    #[serde(default)]
    pub id: Option<i64>,
    pub text: String,
    pub frequency: Frequency,
    /// Cycle length in seconds, derived from `frequency` when the goal was created.
    pub interval_secs: u64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    /// Create an unsaved goal whose interval comes from the frequency table.
    pub fn new(text: impl Into<String>, frequency: Frequency, intervals: &IntervalConfig) -> Self {
        Self {
            id: None,
            text: text.into(),
            frequency,
            interval_secs: intervals.secs_for(frequency),
            deadline: None,
            completed: false,
            completed_at: None,
        }
    }

    /// Create an unsaved goal with an explicit cycle length.
    pub fn with_interval(text: impl Into<String>, frequency: Frequency, interval: Duration) -> Self {
        Self {
            id: None,
            text: text.into(),
            frequency,
            interval_secs: interval.num_seconds().max(0) as u64,
            deadline: None,
            completed: false,
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn interval(&self) -> Duration {
        secs_to_duration(self.interval_secs)
    }

    /// True when the deadline has passed and the goal is still live.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.deadline.is_some_and(|d| d < today)
    }
}

fn secs_to_duration(secs: u64) -> Duration {
    // chrono panics above i64::MAX milliseconds
    let capped = secs.min((i64::MAX / 1000) as u64);
    Duration::seconds(capped as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!(" weekly ".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("BIWEEKLY".parse::<Frequency>().unwrap(), Frequency::Biweekly);
        assert!("monthly".parse::<Frequency>().is_err());
    }

    #[test]
    fn frequency_maps_to_configured_interval() {
        let intervals = IntervalConfig::default();
        assert_eq!(Frequency::Daily.interval(&intervals), Duration::days(1));
        assert_eq!(Frequency::Weekly.interval(&intervals), Duration::weeks(1));
        assert_eq!(Frequency::Biweekly.interval(&intervals), Duration::weeks(2));
    }

    #[test]
    fn intervals_grow_with_frequency() {
        let intervals = IntervalConfig::default();
        let lengths: Vec<_> = Frequency::ALL.iter().map(|f| f.interval(&intervals)).collect();
        assert!(lengths[0] < lengths[1]);
        assert!(lengths[1] < lengths[2]);
    }

    #[test]
    fn goal_new_uses_frequency_table() {
        let intervals = IntervalConfig {
            daily_secs: 10,
            weekly_secs: 70,
            biweekly_secs: 140,
        };
        let goal = Goal::new("Read", Frequency::Weekly, &intervals);
        assert_eq!(goal.interval(), Duration::seconds(70));
        assert!(goal.id.is_none());
        assert!(!goal.completed);
    }

    #[test]
    fn overdue_only_for_live_goals_past_deadline() {
        let deadline = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut goal = Goal::with_interval("Run", Frequency::Daily, Duration::seconds(10))
            .with_deadline(deadline);

        assert!(!goal.is_overdue(deadline));
        assert!(goal.is_overdue(deadline.succ_opt().unwrap()));

        goal.completed = true;
        assert!(!goal.is_overdue(deadline.succ_opt().unwrap()));
    }

    #[test]
    fn goal_deserializes_with_missing_optional_fields() {
        let goal: Goal = serde_json::from_str(
            r#"{"text":"Stretch","frequency":"daily","interval_secs":86400}"#,
        )
        .unwrap();
        assert_eq!(goal.frequency, Frequency::Daily);
        assert!(goal.deadline.is_none());
        assert!(!goal.completed);
    }
}
