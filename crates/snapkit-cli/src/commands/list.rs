//! `snapkit list`

use super::{fail, print_json, Session};
use miette::Result;
use serde::Serialize;
use snapkit_core::Config;
use snapkit_proto::Snap;

/// List result for JSON output.
#[derive(Serialize)]
struct ListResult {
    ok: bool,
    snaps: Vec<Snap>,
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let session = Session::new(config);
    let mut snaps = match session.client().snaps() {
        Ok(snaps) => snaps,
        Err(e) => return fail(e, json),
    };
    snaps.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        return print_json(&ListResult { ok: true, snaps });
    }

    println!("{:<24} {:<20} {:<8} {:<20} NOTES", "NAME", "VERSION", "REV", "TRACKING");
    for snap in &snaps {
        let mut notes = Vec::new();
        if snap.devmode {
            notes.push("devmode");
        }
        if let Some(confinement) = snap.confinement.as_deref().filter(|c| *c != "strict") {
            notes.push(confinement);
        }
        if snap.status.as_deref().is_some_and(|s| s != "active") {
            notes.push("disabled");
        }
        println!(
            "{:<24} {:<20} {:<8} {:<20} {}",
            snap.name,
            snap.version,
            snap.revision.as_deref().unwrap_or("-"),
            snap.tracking_channel
                .as_deref()
                .or(snap.channel.as_deref())
                .unwrap_or("-"),
            if notes.is_empty() { "-".to_string() } else { notes.join(",") },
        );
    }
    Ok(())
}
