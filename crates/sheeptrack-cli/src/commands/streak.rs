use chrono::Utc;
use serde_json::json;
use sheeptrack_core::{Config, Database};

use super::{current_user, print_json, CmdResult};

pub fn run() -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?.with_tracker_config(&config.tracker);
    let user = current_user(&db)?;

    let mut record = db.load_streak(user.id)?;
    if record.refresh(Utc::now()) {
        db.save_streak(user.id, &record)?;
    }

    print_json(&json!({
        "streak": record,
        "message": record.message(),
    }))
}
