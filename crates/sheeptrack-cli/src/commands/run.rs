use std::time::Duration;

use sheeptrack_core::{Config, Database, DecayDriver};
use tracing::{info, warn};

use super::{current_user, tick_stored, CmdResult};

/// Poll the decay timers in the foreground, printing each event as a JSON
/// line.
///
/// Every tick reloads the stored session, applies due cycles and saves it
/// under the write lock, so check-ins made from another shell while this
/// runs are seen by the next tick. Stored timers are left running on exit.
pub fn run(duration_secs: Option<u64>) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?.with_tracker_config(&config.tracker);
    let user = current_user(&db)?;
    let policy = config.completion_policy();
    let driver = DecayDriver::new(config.tick_period());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let emitted = runtime.block_on(async {
        let shutdown = async {
            match duration_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                    }
                }
            }
        };

        driver
            .drive(shutdown, |now| match tick_stored(&db, user.id, policy, now) {
                Ok(events) => {
                    for event in &events {
                        match serde_json::to_string(event) {
                            Ok(line) => println!("{line}"),
                            Err(e) => warn!(error = %e, "failed to encode event"),
                        }
                    }
                    events.len()
                }
                Err(e) => {
                    warn!(error = %e, "decay tick failed");
                    0
                }
            })
            .await
    });

    info!(emitted, "run finished");
    Ok(())
}
