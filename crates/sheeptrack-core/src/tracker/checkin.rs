//! User-initiated transitions on a single goal.
//!
//! ## State Transitions
//!
//! ```text
//! Active(3) <-> Active(0..=2) -> Completed
//! ```
//!
//! Hearts only rise through [`CheckInController::acknowledge`]; they fall
//! through decay. Completion is one-way. Every action on a completed goal is
//! rejected with [`TrackerError::InvalidTransition`] and leaves it untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::coordinator::GoalSetCoordinator;
use crate::error::TrackerError;
use crate::events::Event;
use crate::goal::{GoalState, MAX_HEARTS};

/// Whether a goal may be completed while its sheep is dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPolicy {
    pub allow_complete_when_dead: bool,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            allow_complete_when_dead: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckInController {
    policy: CompletionPolicy,
}

impl CheckInController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CompletionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Confirm progress for the current cycle.
    ///
    /// Gains one heart (capped at 3), including the revival from 0 to 1.
    /// A second acknowledgement in the same cycle is a no-op and returns
    /// `Ok(None)`.
    pub fn acknowledge(
        &self,
        index: usize,
        state: &mut GoalState,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, TrackerError> {
        ensure_live(index, state, "acknowledge")?;
        if state.acknowledged_today {
            return Ok(None);
        }

        let before = state.hearts;
        if state.hearts < MAX_HEARTS {
            state.hearts += 1;
        }
        state.previous_hearts = before;
        state.acknowledged_today = true;

        debug!(goal_index = index, hearts = state.hearts, "goal acknowledged");
        Ok(Some(Event::GoalAcknowledged {
            goal_index: index,
            hearts: state.hearts,
            previous_hearts: before,
            at: now,
        }))
    }

    /// Undo this cycle's acknowledgement, restoring the hearts it gained.
    ///
    /// Only possible until the cycle ends: once decay has cleared the flag
    /// there is nothing to undo and this returns `Ok(None)`.
    pub fn unacknowledge(
        &self,
        index: usize,
        state: &mut GoalState,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, TrackerError> {
        ensure_live(index, state, "unacknowledge")?;
        if !state.acknowledged_today {
            return Ok(None);
        }

        state.acknowledged_today = false;
        state.hearts = state.previous_hearts;

        debug!(goal_index = index, hearts = state.hearts, "acknowledgement undone");
        Ok(Some(Event::AcknowledgementUndone {
            goal_index: index,
            hearts: state.hearts,
            at: now,
        }))
    }

    /// Mark the goal finished. Decay stops permanently.
    pub fn mark_completed(
        &self,
        index: usize,
        state: &mut GoalState,
        now: DateTime<Utc>,
    ) -> Result<Event, TrackerError> {
        ensure_live(index, state, "complete")?;
        if state.is_dead() && !self.policy.allow_complete_when_dead {
            warn!(goal_index = index, "completion blocked: sheep is dead");
            return Err(TrackerError::CompletionBlocked { index });
        }

        state.completed = true;
        state.completed_at = Some(now);

        Ok(Event::GoalCompleted {
            goal_index: index,
            completed_at: now,
        })
    }

    /// Drop a goal together with its decay timer.
    pub fn remove(
        &self,
        coordinator: &mut GoalSetCoordinator,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Event, TrackerError> {
        coordinator.remove_at(index, now)
    }
}

fn ensure_live(index: usize, state: &GoalState, action: &'static str) -> Result<(), TrackerError> {
    if state.completed {
        warn!(goal_index = index, action, "rejected action on completed goal");
        return Err(TrackerError::InvalidTransition { index, action });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(hearts: u8) -> GoalState {
        GoalState {
            hearts,
            previous_hearts: hearts,
            ..GoalState::new()
        }
    }

    #[test]
    fn acknowledge_revives_dead_sheep() {
        let controller = CheckInController::new();
        let mut state = state_with(0);

        let event = controller.acknowledge(0, &mut state, Utc::now()).unwrap();

        assert!(event.is_some());
        assert_eq!(state.hearts, 1);
        assert_eq!(state.previous_hearts, 0);
        assert!(state.acknowledged_today);
    }

    #[test]
    fn acknowledge_then_undo_restores_hearts() {
        let controller = CheckInController::new();
        let mut state = state_with(2);

        controller.acknowledge(0, &mut state, Utc::now()).unwrap();
        assert_eq!(state.hearts, 3);
        assert_eq!(state.previous_hearts, 2);

        controller.unacknowledge(0, &mut state, Utc::now()).unwrap();
        assert_eq!(state.hearts, 2);
        assert!(!state.acknowledged_today);
    }

    #[test]
    fn acknowledge_at_full_health_stays_full() {
        let controller = CheckInController::new();
        let mut state = GoalState::new();

        controller.acknowledge(0, &mut state, Utc::now()).unwrap();
        assert_eq!(state.hearts, 3);
        assert_eq!(state.previous_hearts, 3);

        controller.unacknowledge(0, &mut state, Utc::now()).unwrap();
        assert_eq!(state.hearts, 3);
    }

    #[test]
    fn second_acknowledge_in_same_cycle_is_noop() {
        let controller = CheckInController::new();
        let mut state = state_with(1);

        controller.acknowledge(0, &mut state, Utc::now()).unwrap();
        let again = controller.acknowledge(0, &mut state, Utc::now()).unwrap();

        assert!(again.is_none());
        assert_eq!(state.hearts, 2);
        assert_eq!(state.previous_hearts, 1);
    }

    #[test]
    fn undo_without_acknowledgement_is_noop() {
        let controller = CheckInController::new();
        let mut state = state_with(2);

        let event = controller.unacknowledge(0, &mut state, Utc::now()).unwrap();

        assert!(event.is_none());
        assert_eq!(state, state_with(2));
    }

    #[test]
    fn completed_goal_rejects_every_action() {
        let controller = CheckInController::new();
        let mut state = state_with(2);
        controller.mark_completed(4, &mut state, Utc::now()).unwrap();
        let before = state;

        assert_eq!(
            controller.acknowledge(4, &mut state, Utc::now()),
            Err(TrackerError::InvalidTransition { index: 4, action: "acknowledge" })
        );
        assert!(controller.unacknowledge(4, &mut state, Utc::now()).is_err());
        assert!(controller.mark_completed(4, &mut state, Utc::now()).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn completion_sets_timestamp_once() {
        let controller = CheckInController::new();
        let mut state = state_with(1);
        let now = Utc::now();

        let event = controller.mark_completed(0, &mut state, now).unwrap();

        assert_eq!(event, Event::GoalCompleted { goal_index: 0, completed_at: now });
        assert!(state.completed);
        assert_eq!(state.completed_at, Some(now));
    }

    #[test]
    fn dead_completion_follows_policy() {
        let strict = CheckInController::with_policy(CompletionPolicy {
            allow_complete_when_dead: false,
        });
        let mut state = state_with(0);
        assert_eq!(
            strict.mark_completed(1, &mut state, Utc::now()),
            Err(TrackerError::CompletionBlocked { index: 1 })
        );
        assert!(!state.completed);

        let lenient = CheckInController::new();
        assert!(lenient.mark_completed(1, &mut state, Utc::now()).is_ok());
        assert!(state.completed);
    }
}
