//! `snapkit wait`

use super::{fail, print_json, Session};
use miette::Result;
use serde::Serialize;
use snapkit_core::Config;
use snapkit_proto::Change;

/// Wait result for JSON output.
#[derive(Serialize)]
struct WaitResult {
    ok: bool,
    change: Change,
}

/// Track a change submitted earlier, possibly by another client.
pub fn run(config: &Config, change_id: &str, json: bool) -> Result<()> {
    let session = Session::new(config);
    let change = match session.coordinator().wait(change_id) {
        Ok(change) => change,
        Err(e) => return fail(e, json),
    };

    if json {
        return print_json(&WaitResult { ok: true, change });
    }
    if change.summary.is_empty() {
        println!("change {}: {}", change.id, change.status);
    } else {
        println!("change {}: {} ({})", change.id, change.status, change.summary);
    }
    Ok(())
}
