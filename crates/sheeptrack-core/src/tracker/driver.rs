//! Real-time loop that keeps a coordinator's decay timers running.
//!
//! The coordinator itself never sleeps; this driver polls it on a fixed
//! period from a single tokio task. [`DecayDriver::run`] owns a coordinator
//! for the whole run and cancels every timer when the shutdown future
//! resolves. [`DecayDriver::drive`] only supplies the clock, for callers
//! whose coordinator is stored elsewhere and shared with other writers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::coordinator::GoalSetCoordinator;
use crate::events::Event;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct DecayDriver {
    period: Duration,
    clock: Clock,
}

impl DecayDriver {
    /// Poll every `period` using the system clock.
    pub fn new(period: Duration) -> Self {
        Self::with_clock(period, Arc::new(Utc::now))
    }

    pub fn with_clock(period: Duration, clock: Clock) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            clock,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick `coordinator` until `shutdown` resolves.
    ///
    /// `sink` is called with each non-empty batch of events, after the
    /// coordinator has applied them. Returns the total number of events.
    pub async fn run<F, S>(
        &self,
        coordinator: &mut GoalSetCoordinator,
        shutdown: F,
        mut sink: S,
    ) -> usize
    where
        F: Future<Output = ()>,
        S: FnMut(&GoalSetCoordinator, &[Event]),
    {
        debug!(goals = coordinator.len(), "driving in-memory coordinator");
        let emitted = self
            .drive(shutdown, |now| {
                let events = coordinator.tick(now);
                if !events.is_empty() {
                    sink(coordinator, &events);
                }
                events.len()
            })
            .await;

        coordinator.teardown();
        emitted
    }

    /// Call `on_tick` with the current time every period until `shutdown`
    /// resolves.
    ///
    /// For state that lives outside this task: `on_tick` loads it, ticks it
    /// and stores it again, returning how many events that produced. Nothing
    /// is held between ticks, so changes made elsewhere are never lost.
    pub async fn drive<F, T>(&self, shutdown: F, mut on_tick: T) -> usize
    where
        F: Future<Output = ()>,
        T: FnMut(DateTime<Utc>) -> usize,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            period_ms = self.period.as_millis() as u64,
            "decay driver started"
        );

        let mut emitted = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let count = on_tick((self.clock)());
                    if count > 0 {
                        debug!(count, "decay events");
                        emitted += count;
                    }
                }
            }
        }

        info!(emitted, "decay driver stopped");
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{Frequency, Goal};
    use crate::tracker::CompletionPolicy;
    use chrono::TimeZone;

    fn paused_clock() -> Clock {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let start = tokio::time::Instant::now();
        Arc::new(move || {
            base + chrono::Duration::from_std(start.elapsed()).unwrap_or_else(|_| chrono::Duration::zero())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn driver_ticks_until_shutdown_then_cancels_timers() {
        let clock = paused_clock();
        let goals = vec![
            Goal::with_interval("Walk", Frequency::Daily, chrono::Duration::seconds(10)),
            Goal::with_interval("Read", Frequency::Weekly, chrono::Duration::seconds(60)),
        ];
        let mut coordinator =
            GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), clock());
        let driver = DecayDriver::with_clock(Duration::from_millis(500), clock);

        let mut seen = Vec::new();
        let emitted = driver
            .run(
                &mut coordinator,
                tokio::time::sleep(Duration::from_millis(25_200)),
                |_, events| seen.extend(events.iter().cloned()),
            )
            .await;

        assert_eq!(emitted, 2);
        assert!(seen.iter().all(|e| e.goal_index() == Some(0)));
        assert_eq!(coordinator.state(0).unwrap().hearts, 1);
        assert_eq!(coordinator.state(1).unwrap().hearts, 3);
        assert_eq!(coordinator.running_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drive_sees_changes_made_between_ticks() {
        let clock = paused_clock();
        let goals = vec![Goal::with_interval("Walk", Frequency::Daily, chrono::Duration::seconds(10))];
        let saved = GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), clock());
        let store = std::cell::RefCell::new(serde_json::to_string(&saved).unwrap());
        let driver = DecayDriver::with_clock(Duration::from_millis(500), clock.clone());

        let load = || serde_json::from_str::<GoalSetCoordinator>(&store.borrow()).unwrap();
        let save = |c: &GoalSetCoordinator| *store.borrow_mut() = serde_json::to_string(c).unwrap();

        let shutdown = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let mut other = load();
            other.acknowledge(0, clock()).unwrap();
            save(&other);
            tokio::time::sleep(Duration::from_secs(10)).await;
        };
        let emitted = driver
            .drive(shutdown, |now| {
                let mut coordinator = load();
                let events = coordinator.tick(now);
                save(&coordinator);
                events.len()
            })
            .await;

        let after = load();
        assert_eq!(emitted, 0);
        assert_eq!(after.state(0).unwrap().hearts, 3);
        assert!(!after.state(0).unwrap().acknowledged_today);
        assert_eq!(after.running_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_shutdown_still_tears_down() {
        let goals = vec![Goal::with_interval("Walk", Frequency::Daily, chrono::Duration::seconds(10))];
        let mut coordinator =
            GoalSetCoordinator::from_goals(&goals, CompletionPolicy::default(), Utc::now());
        let driver = DecayDriver::new(Duration::from_secs(1));

        let emitted = driver
            .run(&mut coordinator, std::future::ready(()), |_, _| {})
            .await;

        assert_eq!(emitted, 0);
        assert_eq!(coordinator.running_timers(), 0);
    }
}
