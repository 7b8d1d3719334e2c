//! Per-goal decay timer.
//!
//! Like the rest of the tracker this is wall-clock based and owns no thread:
//! the scheduler remembers when its next cycle is due, and whoever drives it
//! calls [`DecayScheduler::poll`] with the current time. Each goal has its own
//! scheduler with its own interval and start time, so goals never share a
//! tick.
//!
//! ```text
//! new -> start(now) -> poll(now)* -> cancel()
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::goal::{GoalState, MAX_HEARTS};

/// After this many consecutive cycles the state is fixed (0 hearts, not
/// acknowledged), so replaying more of them cannot change anything.
pub const MAX_CATCH_UP_CYCLES: u32 = MAX_HEARTS as u32 + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayScheduler {
    interval_secs: u64,
    /// When the next cycle ends. `None` while stopped or after cancellation.
    next_due: Option<DateTime<Utc>>,
}

impl DecayScheduler {
    /// Create a stopped scheduler. A zero interval never fires.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_secs: interval.num_seconds().max(0) as u64,
            next_due: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_secs.min((i64::MAX / 1000) as u64) as i64)
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting the first cycle from `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.interval_secs == 0 {
            return;
        }
        // An interval too large to represent never comes due.
        self.next_due = now.checked_add_signed(self.interval());
    }

    /// Stop for good. A cancelled scheduler never reports due cycles.
    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Number of whole cycles that ended at or before `now`.
    ///
    /// Advances `next_due` past `now` in whole intervals so the cadence does
    /// not drift, however late the poll arrives.
    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let Some(due) = self.next_due else {
            return 0;
        };
        if now < due {
            return 0;
        }

        let interval_ms = self.interval().num_milliseconds();
        let behind_ms = (now - due).num_milliseconds();
        let cycles = behind_ms / interval_ms + 1;
        let advance = Duration::milliseconds(interval_ms.saturating_mul(cycles));
        self.next_due = due.checked_add_signed(advance);

        debug!(cycles, interval_secs = self.interval_secs, "decay cycles elapsed");
        u32::try_from(cycles).unwrap_or(u32::MAX)
    }

    /// Apply the end of one cycle to `state`.
    ///
    /// Returns true only when a heart was actually taken. Completed goals are
    /// left untouched. Otherwise the acknowledgement is cleared for the next
    /// cycle whether or not a heart was lost, and hearts never go below 0.
    pub fn on_cycle_elapsed(state: &mut GoalState) -> bool {
        if state.completed {
            return false;
        }

        let lost = !state.acknowledged_today && state.hearts > 0;
        if lost {
            state.hearts -= 1;
            state.previous_hearts = state.hearts;
        }
        state.acknowledged_today = false;
        lost
    }
}
