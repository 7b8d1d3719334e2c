use chrono::Utc;
use clap::Subcommand;
use sheeptrack_core::GoalStore;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum CheckAction {
    /// Acknowledge progress on the goal at INDEX for this cycle
    In { index: usize },
    /// Undo this cycle's acknowledgement
    Undo { index: usize },
    /// Mark the goal at INDEX completed
    Complete { index: usize },
}

pub fn run(action: CheckAction) -> CmdResult {
    let mut session = Session::open()?;
    let now = Utc::now();
    let mut events = Vec::new();

    match action {
        CheckAction::In { index } => {
            if let Some(event) = session.coordinator.acknowledge(index, now)? {
                events.push(event);
                let mut streak = session.db.load_streak(session.user.id)?;
                if let Some(update) = streak.check_in(now) {
                    session.db.save_streak(session.user.id, &streak)?;
                    events.push(update);
                }
            }
        }
        CheckAction::Undo { index } => {
            events.extend(session.coordinator.unacknowledge(index, now)?);
        }
        CheckAction::Complete { index } => {
            let goal_id = session.goal_id(index)?;
            let event = session.coordinator.mark_completed(index, now)?;
            session.db.save_goal_completion(goal_id, now)?;
            events.push(event);
        }
    }

    print_json(&events)?;
    session.save()
}
