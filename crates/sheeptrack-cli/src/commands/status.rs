use serde_json::json;

use super::{print_json, CmdResult, Session};

pub fn run() -> CmdResult {
    let session = Session::open()?;

    print_json(&json!({
        "user": session.user.user_name,
        "goals": session.coordinator.snapshots(),
        "summary": session.coordinator.summary(),
        "events": session.pending,
    }))?;

    session.save()
}
