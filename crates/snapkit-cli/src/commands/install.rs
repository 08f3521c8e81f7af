//! `snapkit install`, `upgrade`, `remove` and `purge`.

use super::{fail, parse_assignment, print_json, Session};
use miette::Result;
use serde::Serialize;
use snapkit_core::package::PackageEntry;
use snapkit_core::paths;
use snapkit_core::{
    Config, Error, Intent, OperationReport, OperationRequest, OptionSet, PackageSpec,
    PlannedPackage, Transition,
};
use std::path::PathBuf;

/// Parsed arguments of a change command.
#[derive(Debug, Clone)]
pub struct ChangeAction {
    pub intent: Intent,
    pub packages: Vec<String>,
    pub channel: String,
    /// Boolean options that were switched on.
    pub flags: Vec<String>,
    /// Raw `KEY=VALUE` pass-through options.
    pub options: Vec<String>,
    pub revision: Option<String>,
    pub source: Option<PathBuf>,
    pub dry_run: bool,
}

/// Change result for JSON output.
#[derive(Serialize)]
struct ChangeResult {
    ok: bool,
    #[serde(flatten)]
    report: OperationReport,
}

/// Dry-run result for JSON output.
#[derive(Serialize)]
struct PlanResult {
    ok: bool,
    intent: Intent,
    packages: Vec<PlannedPackage>,
}

impl ChangeAction {
    fn request(&self) -> Result<OperationRequest, Error> {
        let entries = self
            .packages
            .iter()
            .map(|raw| raw.parse::<PackageEntry>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut options: OptionSet = self.flags.iter().map(|flag| (flag.as_str(), true)).collect();
        for raw in &self.options {
            let (key, value) = parse_assignment(raw).map_err(Error::InvalidSpec)?;
            options.insert(key, value);
        }

        if let Some(source) = &self.source {
            if !paths::is_local_source(source) {
                return Err(Error::InvalidSpec(format!(
                    "source {} is not a file",
                    source.display()
                )));
            }
        }

        Ok(OperationRequest::new(PackageSpec::from_entries(entries))
            .with_channel(self.channel.clone())
            .with_options(options)
            .with_revision(self.revision.clone())
            .with_source(self.source.clone()))
    }
}

pub fn run(config: &Config, action: ChangeAction, json: bool) -> Result<()> {
    let request = match action.request() {
        Ok(request) => request,
        Err(e) => return fail(e, json),
    };

    let session = Session::new(config);
    let coordinator = session.coordinator();

    if action.dry_run {
        return match coordinator.plan(action.intent, &request) {
            Ok(packages) => print_plan(action.intent, packages, json),
            Err(e) => fail(e, json),
        };
    }

    let span = tracing::info_span!("change", cmd = action.intent.as_str());
    let _guard = span.enter();

    match coordinator.run(action.intent, &request) {
        Ok(report) => {
            if json {
                print_json(&ChangeResult { ok: true, report })
            } else {
                print_report(&report);
                Ok(())
            }
        }
        Err(e) => fail(e, json),
    }
}

fn print_report(report: &OperationReport) {
    if let Some(source) = &report.local_source {
        println!("{} {}", report.intent.as_str(), source.display());
        if let Some(output) = &report.cli_output {
            let stdout = output.stdout.trim_end();
            if !stdout.is_empty() {
                println!("{stdout}");
            }
        }
        return;
    }

    if report.skipped() {
        println!("nothing to {}", report.intent.as_str());
        return;
    }

    let sign = match report.intent {
        Intent::Install | Intent::Upgrade => '+',
        Intent::Remove | Intent::Purge => '-',
    };
    for target in &report.targets {
        match &target.version {
            Some(version) => println!("{sign} {} {version}", target.name),
            None => println!("{sign} {}", target.name),
        }
    }
    if let Some(change_id) = &report.change_id {
        let status = report.change.as_ref().map_or("?", |c| c.status.as_str());
        println!("change {change_id}: {status}");
    }
}

fn print_plan(intent: Intent, packages: Vec<PlannedPackage>, json: bool) -> Result<()> {
    if json {
        return print_json(&PlanResult {
            ok: true,
            intent,
            packages,
        });
    }

    for planned in &packages {
        let Some(name) = &planned.state.name else {
            continue;
        };
        let installed = planned.state.installed.as_deref().unwrap_or("-");
        let target = planned
            .state
            .requested
            .as_deref()
            .or(planned.state.available.as_deref())
            .unwrap_or("-");
        let verb = match planned.transition {
            Transition::Install => "install",
            Transition::Upgrade => "upgrade",
            Transition::Remove => "remove",
            Transition::Unchanged => "unchanged",
        };
        println!("{name}: {verb} ({installed} -> {target})");
    }
    Ok(())
}
