mod checkin;
mod coordinator;
mod decay;
mod driver;

pub use checkin::{CheckInController, CompletionPolicy};
pub use coordinator::{ArchivedGoal, GoalSetCoordinator, GoalSnapshot, Summary};
pub use decay::{DecayScheduler, MAX_CATCH_UP_CYCLES};
pub use driver::DecayDriver;
