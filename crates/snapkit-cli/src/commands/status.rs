//! `snapkit status`: installed and available versions side by side.

use super::{fail, print_json, Session};
use miette::Result;
use serde::Serialize;
use snapkit_core::{Config, Intent, OperationRequest, PackageSpec, PlannedPackage, Transition};

/// Status result for JSON output.
#[derive(Serialize)]
struct StatusResult {
    ok: bool,
    channel: String,
    packages: Vec<PlannedPackage>,
}

/// Resolve each snap as an upgrade would, without submitting anything.
pub fn run(config: &Config, names: &[String], channel: &str, json: bool) -> Result<()> {
    let session = Session::new(config);
    let request = OperationRequest::new(PackageSpec::from_names(names.iter().cloned()))
        .with_channel(channel);

    let packages = match session.coordinator().plan(Intent::Upgrade, &request) {
        Ok(packages) => packages,
        Err(e) => return fail(e, json),
    };

    if json {
        return print_json(&StatusResult {
            ok: true,
            channel: channel.to_string(),
            packages,
        });
    }

    println!("{:<24} {:<16} {:<16} NOTE", "NAME", "INSTALLED", "AVAILABLE");
    for planned in &packages {
        let state = &planned.state;
        let note = match planned.transition {
            Transition::Install => "not installed",
            Transition::Upgrade => "update available",
            Transition::Remove | Transition::Unchanged => "",
        };
        println!(
            "{:<24} {:<16} {:<16} {note}",
            state.name.as_deref().unwrap_or("-"),
            state.installed.as_deref().unwrap_or("-"),
            state.available.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
