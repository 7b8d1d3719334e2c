//! Owns one [`GoalState`] and one [`DecayScheduler`] per goal.
//!
//! Entries are keyed by position so they line up with the goal list owned
//! by the persistence layer. Reconciliation only ever appends; removal
//! shifts later entries down by one, exactly as the external list does when
//! a goal is deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::checkin::{CheckInController, CompletionPolicy};
use super::decay::{DecayScheduler, MAX_CATCH_UP_CYCLES};
use crate::error::TrackerError;
use crate::events::Event;
use crate::goal::{Frequency, Goal, GoalState, PetMood};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackedGoal {
    goal: Goal,
    state: GoalState,
    scheduler: DecayScheduler,
}

impl TrackedGoal {
    /// Begin tracking `goal` at `index`. A goal that is already completed
    /// gets a completed state and no running timer.
    fn start(index: usize, goal: &Goal, now: DateTime<Utc>) -> (Self, Event) {
        let mut scheduler = DecayScheduler::new(goal.interval());
        let state = if goal.completed {
            GoalState::completed_at(goal.completed_at.unwrap_or(now))
        } else {
            scheduler.start(now);
            GoalState::new()
        };

        debug!(goal_index = index, text = %goal.text, "tracking goal");
        let event = Event::GoalTracked {
            goal_index: index,
            goal_text: goal.text.clone(),
            interval_secs: goal.interval_secs,
            at: now,
        };
        let tracked = Self {
            goal: goal.clone(),
            state,
            scheduler,
        };
        (tracked, event)
    }

    /// Take the editable parts of the definition; state and timer stay.
    fn refresh(&mut self, goal: &Goal) {
        self.goal.id = goal.id;
        self.goal.text.clone_from(&goal.text);
        self.goal.deadline = goal.deadline;
    }
}

/// Read-only view of one goal for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub index: usize,
    pub id: Option<i64>,
    pub text: String,
    pub frequency: Frequency,
    pub hearts: u8,
    pub acknowledged_today: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline: Option<NaiveDate>,
    pub mood: PetMood,
    pub next_decay_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub active_count: usize,
    pub completed_count: usize,
    pub all_complete: bool,
}

/// A finished goal as shown in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedGoal {
    pub original_index: usize,
    pub id: Option<i64>,
    pub text: String,
    pub frequency: Frequency,
    pub deadline: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalSetCoordinator {
    goals: Vec<TrackedGoal>,
    #[serde(default)]
    policy: CompletionPolicy,
}

impl GoalSetCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CompletionPolicy) -> Self {
        Self {
            goals: Vec::new(),
            policy,
        }
    }

    /// Build a coordinator and start tracking every goal in `goals`.
    pub fn from_goals(goals: &[Goal], policy: CompletionPolicy, now: DateTime<Utc>) -> Self {
        let mut coordinator = Self::with_policy(policy);
        coordinator.reconcile(goals, now);
        coordinator
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CompletionPolicy) {
        self.policy = policy;
    }

    fn controller(&self) -> CheckInController {
        CheckInController::with_policy(self.policy)
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Start tracking every goal in `goals` that has no state yet.
    ///
    /// Existing entries keep their state and timer; only their definition
    /// (id, text, deadline) is refreshed. Calling this twice with the same
    /// list changes nothing the second time. A goal that arrives already
    /// completed is tracked as completed and its timer never starts.
    pub fn reconcile(&mut self, goals: &[Goal], now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();

        for (index, goal) in goals.iter().enumerate() {
            if let Some(tracked) = self.goals.get_mut(index) {
                tracked.refresh(goal);
                continue;
            }

            let (tracked, event) = TrackedGoal::start(index, goal, now);
            events.push(event);
            self.goals.push(tracked);
        }

        events
    }

    /// Line saved entries up with `goals` by store id.
    ///
    /// Used when restoring a saved session after the store changed behind
    /// it. Entries whose id is still in `goals` keep their state and timer
    /// and move to that goal's position; entries whose goal is gone are
    /// dropped; goals with no saved entry start fresh. When nothing changed
    /// behind the session this is the same as [`reconcile`](Self::reconcile).
    pub fn realign(&mut self, goals: &[Goal], now: DateTime<Utc>) -> Vec<Event> {
        let mut saved: Vec<Option<TrackedGoal>> =
            std::mem::take(&mut self.goals).into_iter().map(Some).collect();
        let mut events = Vec::new();

        for (index, goal) in goals.iter().enumerate() {
            let found = goal.id.and_then(|id| {
                saved
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|t| t.goal.id == Some(id)))
                    .and_then(Option::take)
            });
            match found {
                Some(mut tracked) => {
                    tracked.refresh(goal);
                    self.goals.push(tracked);
                }
                None => {
                    let (tracked, event) = TrackedGoal::start(index, goal, now);
                    events.push(event);
                    self.goals.push(tracked);
                }
            }
        }

        let dropped = saved.iter().flatten().count();
        if dropped > 0 {
            info!(dropped, "dropped saved goals missing from the store");
        }
        events
    }

    /// Cancel and drop the goal at `index`; later goals move down one slot.
    pub fn remove_at(&mut self, index: usize, now: DateTime<Utc>) -> Result<Event, TrackerError> {
        self.check_index(index)?;
        let mut removed = self.goals.remove(index);
        removed.scheduler.cancel();

        info!(goal_index = index, text = %removed.goal.text, "goal removed");
        Ok(Event::GoalRemoved {
            goal_index: index,
            goal_text: removed.goal.text,
            at: now,
        })
    }

    /// Cancel every timer. Used when the session ends.
    pub fn teardown(&mut self) {
        for tracked in &mut self.goals {
            tracked.scheduler.cancel();
        }
        debug!(goals = self.goals.len(), "coordinator torn down");
    }

    // ── Time ─────────────────────────────────────────────────────────

    /// Apply every decay cycle that has ended by `now`.
    ///
    /// Each goal is polled on its own schedule. A `HeartLost` event is
    /// produced for each heart actually taken, never for a cycle that only
    /// cleared the acknowledgement.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();

        for (index, tracked) in self.goals.iter_mut().enumerate() {
            let cycles = tracked.scheduler.poll(now);
            for _ in 0..cycles.min(MAX_CATCH_UP_CYCLES) {
                if DecayScheduler::on_cycle_elapsed(&mut tracked.state) {
                    info!(
                        goal_index = index,
                        hearts = tracked.state.hearts,
                        "heart lost"
                    );
                    events.push(Event::HeartLost {
                        goal_index: index,
                        goal_text: tracked.goal.text.clone(),
                        hearts: tracked.state.hearts,
                        at: now,
                    });
                }
            }
        }

        events
    }

    // ── User actions ─────────────────────────────────────────────────

    pub fn acknowledge(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, TrackerError> {
        let controller = self.controller();
        let tracked = self.entry_mut(index)?;
        controller.acknowledge(index, &mut tracked.state, now)
    }

    pub fn unacknowledge(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, TrackerError> {
        let controller = self.controller();
        let tracked = self.entry_mut(index)?;
        controller.unacknowledge(index, &mut tracked.state, now)
    }

    /// Complete the goal and stop its timer for good.
    pub fn mark_completed(&mut self, index: usize, now: DateTime<Utc>) -> Result<Event, TrackerError> {
        let controller = self.controller();
        let tracked = self.entry_mut(index)?;
        let event = controller.mark_completed(index, &mut tracked.state, now)?;
        tracked.scheduler.cancel();
        tracked.goal.completed = true;
        tracked.goal.completed_at = Some(now);

        info!(goal_index = index, text = %tracked.goal.text, "goal completed");
        Ok(event)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<&GoalState> {
        self.goals.get(index).map(|t| &t.state)
    }

    pub fn goal(&self, index: usize) -> Option<&Goal> {
        self.goals.get(index).map(|t| &t.goal)
    }

    pub fn scheduler(&self, index: usize) -> Option<&DecayScheduler> {
        self.goals.get(index).map(|t| &t.scheduler)
    }

    pub fn active_count(&self) -> usize {
        self.goals.iter().filter(|t| !t.state.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.goals.iter().filter(|t| t.state.completed).count()
    }

    /// Number of timers still running.
    pub fn running_timers(&self) -> usize {
        self.goals.iter().filter(|t| t.scheduler.is_active()).count()
    }

    pub fn is_all_complete(&self) -> bool {
        !self.goals.is_empty() && self.goals.iter().all(|t| t.state.completed)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            active_count: self.active_count(),
            completed_count: self.completed_count(),
            all_complete: self.is_all_complete(),
        }
    }

    pub fn snapshot(&self, index: usize) -> Result<GoalSnapshot, TrackerError> {
        self.check_index(index)?;
        let tracked = &self.goals[index];
        Ok(GoalSnapshot {
            index,
            id: tracked.goal.id,
            text: tracked.goal.text.clone(),
            frequency: tracked.goal.frequency,
            hearts: tracked.state.hearts,
            acknowledged_today: tracked.state.acknowledged_today,
            completed: tracked.state.completed,
            completed_at: tracked.state.completed_at,
            deadline: tracked.goal.deadline,
            mood: PetMood::from_hearts(tracked.state.hearts),
            next_decay_at: tracked.scheduler.next_due(),
        })
    }

    pub fn snapshots(&self) -> Vec<GoalSnapshot> {
        (0..self.goals.len())
            .filter_map(|index| self.snapshot(index).ok())
            .collect()
    }

    /// Completed goals, oldest completion first.
    pub fn archive(&self) -> Vec<ArchivedGoal> {
        let mut archived: Vec<ArchivedGoal> = self
            .goals
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state.completed)
            .map(|(index, t)| ArchivedGoal {
                original_index: index,
                id: t.goal.id,
                text: t.goal.text.clone(),
                frequency: t.goal.frequency,
                deadline: t.goal.deadline,
                completed_at: t.state.completed_at,
            })
            .collect();
        archived.sort_by_key(|a| a.completed_at);
        archived
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn check_index(&self, index: usize) -> Result<(), TrackerError> {
        if index >= self.goals.len() {
            return Err(TrackerError::UnknownIndex {
                index,
                len: self.goals.len(),
            });
        }
        Ok(())
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut TrackedGoal, TrackerError> {
        let len = self.goals.len();
        self.goals
            .get_mut(index)
            .ok_or(TrackerError::UnknownIndex { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
    }

    fn goal(text: &str, secs: i64) -> Goal {
        Goal::with_interval(text, Frequency::Daily, Duration::seconds(secs))
    }

    fn three_goals() -> Vec<Goal> {
        vec![goal("Walk", 10), goal("Read", 20), goal("Cook", 30)]
    }

    fn stored(ids: &[i64]) -> Vec<Goal> {
        ids.iter()
            .map(|&id| goal(&format!("Goal {id}"), 10).with_id(id))
            .collect()
    }

    #[test]
    fn realign_keeps_state_of_goals_still_stored() {
        let mut coordinator = GoalSetCoordinator::new();
        coordinator.reconcile(&stored(&[1, 2, 3]), t0());
        coordinator.tick(t0() + Duration::seconds(20));
        coordinator.acknowledge(2, t0() + Duration::seconds(21)).unwrap();
        let third = *coordinator.state(2).unwrap();
        let first = *coordinator.state(0).unwrap();

        let events = coordinator.realign(&stored(&[1, 3, 4]), t0() + Duration::seconds(22));

        assert_eq!(coordinator.len(), 3);
        assert_eq!(*coordinator.state(0).unwrap(), first);
        assert_eq!(*coordinator.state(1).unwrap(), third);
        assert_eq!(coordinator.goal(1).unwrap().id, Some(3));
        assert_eq!(coordinator.state(2), Some(&GoalState::new()));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::GoalTracked { goal_index: 2, .. }));
    }

    #[test]
    fn realign_without_store_changes_matches_reconcile() {
        let mut coordinator = GoalSetCoordinator::new();
        coordinator.reconcile(&stored(&[1, 2]), t0());
        coordinator.tick(t0() + Duration::seconds(10));
        let before = coordinator.snapshots();

        assert!(coordinator.realign(&stored(&[1, 2]), t0()).is_empty());
        assert_eq!(coordinator.snapshots(), before);
    }

    #[test]
    fn reconcile_creates_default_states() {
        let mut coordinator = GoalSetCoordinator::new();
        let events = coordinator.reconcile(&three_goals(), t0());

        assert_eq!(events.len(), 3);
        assert_eq!(coordinator.len(), 3);
        assert_eq!(coordinator.running_timers(), 3);
        for index in 0..3 {
            assert_eq!(coordinator.state(index), Some(&GoalState::new()));
        }
    }

    #[test]
    fn reconcile_is_idempotent() {
        let goals = three_goals();
        let mut coordinator = GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), t0());
        coordinator.acknowledge(1, t0()).unwrap();
        let due_before: Vec<_> = (0..3).map(|i| coordinator.scheduler(i).unwrap().clone()).collect();

        let events = coordinator.reconcile(&goals, t0() + Duration::seconds(5));

        assert!(events.is_empty());
        assert_eq!(coordinator.len(), 3);
        assert!(coordinator.state(1).unwrap().acknowledged_today);
        for (i, scheduler) in due_before.iter().enumerate() {
            assert_eq!(coordinator.scheduler(i), Some(scheduler));
        }
    }

    #[test]
    fn reconcile_appends_new_goals_only() {
        let mut goals = three_goals();
        goals.truncate(2);
        let mut coordinator = GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), t0());
        coordinator.tick(t0() + Duration::seconds(10));

        goals.push(goal("Cook", 30));
        let events = coordinator.reconcile(&goals, t0() + Duration::seconds(12));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].goal_index(), Some(2));
        assert_eq!(coordinator.state(0).unwrap().hearts, 2);
        assert_eq!(coordinator.state(2).unwrap().hearts, 3);
    }

    #[test]
    fn reconcile_refreshes_definition_text() {
        let mut goals = three_goals();
        let mut coordinator = GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), t0());

        goals[0].text = "Walk the dog".into();
        goals[0].id = Some(7);
        coordinator.reconcile(&goals, t0());

        assert_eq!(coordinator.goal(0).unwrap().text, "Walk the dog");
        assert_eq!(coordinator.goal(0).unwrap().id, Some(7));
    }

    #[test]
    fn already_completed_goal_is_tracked_without_timer() {
        let done_at = t0() - Duration::days(2);
        let mut finished = goal("Paint", 10);
        finished.completed = true;
        finished.completed_at = Some(done_at);

        let coordinator =
            GoalSetCoordinator::from_goals(&[finished], CompletionPolicy::default(), t0());

        let state = coordinator.state(0).unwrap();
        assert!(state.completed);
        assert_eq!(state.completed_at, Some(done_at));
        assert_eq!(coordinator.running_timers(), 0);
        assert!(coordinator.is_all_complete());
    }

    #[test]
    fn tick_emits_heart_lost_only_on_decrement() {
        let mut coordinator =
            GoalSetCoordinator::from_goals(&[goal("Walk", 10)], CompletionPolicy::default(), t0());
        coordinator.acknowledge(0, t0() + Duration::seconds(1)).unwrap();

        let first = coordinator.tick(t0() + Duration::seconds(10));
        assert!(first.is_empty());
        assert_eq!(coordinator.state(0).unwrap().hearts, 3);
        assert!(!coordinator.state(0).unwrap().acknowledged_today);

        let second = coordinator.tick(t0() + Duration::seconds(20));
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], Event::HeartLost { hearts: 2, .. }));
    }

    #[test]
    fn long_absence_bottoms_out_at_zero() {
        let mut coordinator =
            GoalSetCoordinator::from_goals(&[goal("Walk", 10)], CompletionPolicy::default(), t0());

        let events = coordinator.tick(t0() + Duration::days(365));

        assert_eq!(events.len(), 3);
        assert_eq!(coordinator.state(0).unwrap().hearts, 0);
        assert!(coordinator.scheduler(0).unwrap().next_due().unwrap() > t0() + Duration::days(365));
    }

    #[test]
    fn completion_cancels_timer() {
        let mut coordinator = GoalSetCoordinator::from_goals(&three_goals(), CompletionPolicy::default(), t0());

        coordinator.mark_completed(0, t0()).unwrap();

        assert!(!coordinator.scheduler(0).unwrap().is_active());
        assert_eq!(coordinator.running_timers(), 2);
        assert_eq!(coordinator.active_count(), 2);
        assert_eq!(coordinator.completed_count(), 1);
        assert!(coordinator.goal(0).unwrap().completed);
    }

    #[test]
    fn unknown_index_is_an_error() {
        let mut coordinator = GoalSetCoordinator::from_goals(&three_goals(), CompletionPolicy::default(), t0());

        assert_eq!(
            coordinator.acknowledge(3, t0()),
            Err(TrackerError::UnknownIndex { index: 3, len: 3 })
        );
        assert!(coordinator.remove_at(9, t0()).is_err());
        assert!(coordinator.snapshot(3).is_err());
        assert_eq!(coordinator.len(), 3);
    }

    #[test]
    fn all_complete_requires_goals() {
        let mut coordinator = GoalSetCoordinator::new();
        assert!(!coordinator.is_all_complete());

        coordinator.reconcile(&[goal("Walk", 10)], t0());
        assert!(!coordinator.is_all_complete());

        coordinator.mark_completed(0, t0()).unwrap();
        assert!(coordinator.is_all_complete());
        assert_eq!(
            coordinator.summary(),
            Summary { active_count: 0, completed_count: 1, all_complete: true }
        );
    }

    #[test]
    fn archive_lists_completed_goals_in_completion_order() {
        let mut coordinator = GoalSetCoordinator::from_goals(&three_goals(), CompletionPolicy::default(), t0());
        coordinator.mark_completed(2, t0() + Duration::seconds(1)).unwrap();
        coordinator.mark_completed(0, t0() + Duration::seconds(2)).unwrap();

        let archive = coordinator.archive();

        assert_eq!(archive.len(), 2);
        assert_eq!(archive[0].original_index, 2);
        assert_eq!(archive[0].text, "Cook");
        assert_eq!(archive[1].original_index, 0);
    }

    #[test]
    fn teardown_cancels_every_timer() {
        let mut coordinator = GoalSetCoordinator::from_goals(&three_goals(), CompletionPolicy::default(), t0());
        coordinator.teardown();

        assert_eq!(coordinator.running_timers(), 0);
        assert!(coordinator.tick(t0() + Duration::days(1)).is_empty());
    }

    #[test]
    fn snapshot_reports_mood() {
        let mut coordinator =
            GoalSetCoordinator::from_goals(&[goal("Walk", 10)], CompletionPolicy::default(), t0());
        coordinator.tick(t0() + Duration::seconds(20));

        let snap = coordinator.snapshot(0).unwrap();
        assert_eq!(snap.hearts, 1);
        assert_eq!(snap.mood, PetMood::Sick);
        assert_eq!(snap.next_decay_at, Some(t0() + Duration::seconds(30)));
    }

    #[test]
    fn coordinator_survives_serde_roundtrip() {
        let mut coordinator = GoalSetCoordinator::from_goals(&three_goals(), CompletionPolicy::default(), t0());
        coordinator.tick(t0() + Duration::seconds(10));
        coordinator.acknowledge(1, t0() + Duration::seconds(11)).unwrap();

        let json = serde_json::to_string(&coordinator).unwrap();
        let mut restored: GoalSetCoordinator = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.snapshots(), coordinator.snapshots());
        assert_eq!(restored.tick(t0() + Duration::seconds(20)), coordinator.tick(t0() + Duration::seconds(20)));
    }
}
