//! Daily check-in streaks.
//!
//! A streak counts consecutive calendar days (UTC) on which the user
//! acknowledged at least one goal. It is per user, not per goal: the first
//! acknowledgement of the day extends it and later ones are ignored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_check_in: Option<DateTime<Utc>>,
    pub total_days_active: u32,
}

impl StreakRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count today's check-in. Returns false if today was already counted.
    pub fn record_check_in(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        match self.last_day() {
            Some(last) if last == today => return false,
            Some(last) if is_day_before(last, today) => self.current_streak += 1,
            _ => self.current_streak = 1,
        }

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.total_days_active += 1;
        self.last_check_in = Some(now);
        true
    }

    /// Like [`record_check_in`](Self::record_check_in) but reports the change as an event.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.record_check_in(now).then(|| Event::StreakUpdated {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            at: now,
        })
    }

    /// Break the streak if more than a day has passed since the last
    /// check-in. Returns true when the record changed.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        let Some(last) = self.last_day() else {
            return false;
        };
        if last == today || is_day_before(last, today) {
            return false;
        }
        if self.current_streak == 0 {
            return false;
        }
        self.current_streak = 0;
        true
    }

    pub fn message(&self) -> String {
        match self.current_streak {
            0 => "Start your streak today!".to_string(),
            1 => "Great start! Keep it going!".to_string(),
            n if n < 7 => format!("{n} days strong! You're building momentum!"),
            n if n < 14 => format!("{n} day streak! You're on fire!"),
            n if n < 30 => format!("Amazing {n} day streak! You're unstoppable!"),
            n => format!("Incredible {n} day streak! You're a legend!"),
        }
    }

    fn last_day(&self) -> Option<NaiveDate> {
        self.last_check_in.map(|at| at.date_naive())
    }
}

fn is_day_before(day: NaiveDate, today: NaiveDate) -> bool {
    today.pred_opt() == Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, d, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_check_in_starts_streak() {
        let mut record = StreakRecord::new();
        assert!(record.record_check_in(day(1, 9)));
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.longest_streak, 1);
        assert_eq!(record.total_days_active, 1);
    }

    #[test]
    fn same_day_counts_once() {
        let mut record = StreakRecord::new();
        record.record_check_in(day(1, 9));
        assert!(!record.record_check_in(day(1, 22)));
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.total_days_active, 1);
        assert_eq!(record.last_check_in, Some(day(1, 9)));
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut record = StreakRecord::new();
        for d in 1..=5 {
            record.record_check_in(day(d, 8));
        }
        assert_eq!(record.current_streak, 5);
        assert_eq!(record.longest_streak, 5);
    }

    #[test]
    fn gap_restarts_at_one_and_keeps_longest() {
        let mut record = StreakRecord::new();
        record.record_check_in(day(1, 8));
        record.record_check_in(day(2, 8));
        record.record_check_in(day(3, 8));
        record.record_check_in(day(6, 8));

        assert_eq!(record.current_streak, 1);
        assert_eq!(record.longest_streak, 3);
        assert_eq!(record.total_days_active, 4);
    }

    #[test]
    fn refresh_resets_after_missed_day() {
        let mut record = StreakRecord::new();
        record.record_check_in(day(1, 8));
        record.record_check_in(day(2, 8));

        assert!(!record.refresh(day(3, 23)));
        assert_eq!(record.current_streak, 2);

        assert!(record.refresh(day(4, 0)));
        assert_eq!(record.current_streak, 0);
        assert_eq!(record.longest_streak, 2);
        assert!(!record.refresh(day(5, 0)));
    }

    #[test]
    fn check_in_emits_event_only_on_change() {
        let mut record = StreakRecord::new();
        let now = day(10, 12);
        assert!(matches!(
            record.check_in(now),
            Some(Event::StreakUpdated { current_streak: 1, .. })
        ));
        assert!(record.check_in(now + Duration::hours(1)).is_none());
    }

    #[test]
    fn message_scales_with_streak() {
        let mut record = StreakRecord::new();
        assert!(record.message().starts_with("Start"));
        record.current_streak = 1;
        assert!(record.message().starts_with("Great start"));
        record.current_streak = 10;
        assert!(record.message().contains("on fire"));
        record.current_streak = 45;
        assert!(record.message().contains("legend"));
    }
}
