use clap::Subcommand;
use sheeptrack_core::{Config, Database};

use super::{current_user, print_json, set_current_user, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Log in, registering the name on first use
    Login {
        /// User name
        name: String,
    },
    /// Print the logged-in user
    Whoami,
}

pub fn run(action: UserAction) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?.with_tracker_config(&config.tracker);

    match action {
        UserAction::Login { name } => {
            let user = db.login_or_register(&name)?;
            set_current_user(&db, &user)?;
            print_json(&user)?;
        }
        UserAction::Whoami => {
            let user = current_user(&db)?;
            print_json(&user)?;
        }
    }
    Ok(())
}
