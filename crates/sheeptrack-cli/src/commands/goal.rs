use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use sheeptrack_core::{Frequency, Goal, GoalStore};

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Add a goal (at most three live goals)
    Add {
        /// What you want to achieve
        text: String,
        /// daily, weekly or biweekly
        #[arg(long, short, default_value = "daily")]
        frequency: Frequency,
        /// Deadline as YYYY-MM-DD (defaults to 30 days from now)
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// Change the text or deadline of the goal at INDEX
    Edit {
        index: usize,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New deadline as YYYY-MM-DD
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// List goals with their sheep
    List,
    /// Remove the goal at INDEX; later goals move up
    Remove {
        index: usize,
    },
    /// List completed goals
    Archive,
}

pub fn run(action: GoalAction) -> CmdResult {
    let mut session = Session::open()?;
    let now = Utc::now();

    match action {
        GoalAction::Add {
            text,
            frequency,
            deadline,
        } => {
            let mut goal = Goal::new(text, frequency, &session.config.intervals);
            if let Some(deadline) = deadline {
                goal = goal.with_deadline(deadline);
            }
            session.db.create_goal(session.user.id, &goal)?;

            let goals = session.db.fetch_goals_for_user(session.user.id)?;
            let events = session.coordinator.reconcile(&goals, now);
            print_json(&events)?;
        }
        GoalAction::Edit {
            index,
            text,
            deadline,
        } => {
            let goal_id = session.goal_id(index)?;
            let current = session.coordinator.snapshot(index)?;
            let text = text.unwrap_or(current.text);
            let deadline = deadline.or(current.deadline);
            session.db.update_goal(goal_id, &text, deadline)?;

            let goals = session.db.fetch_goals_for_user(session.user.id)?;
            session.coordinator.reconcile(&goals, now);
            print_json(&session.coordinator.snapshot(index)?)?;
        }
        GoalAction::List => {
            print_json(&session.coordinator.snapshots())?;
        }
        GoalAction::Remove { index } => {
            let goal_id = session.goal_id(index)?;
            let event = session.coordinator.remove_at(index, now)?;
            session.db.delete_goal(goal_id)?;
            print_json(&event)?;
        }
        GoalAction::Archive => {
            print_json(&session.coordinator.archive())?;
        }
    }

    session.save()
}
