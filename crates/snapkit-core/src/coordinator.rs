//! Drives one operation from resolution to a terminal change.
//!
//! Every invocation walks the same phases:
//!
//! ```text
//! Resolving -> Requesting -> Tracking -> Done
//!      \            \            \
//!       +------------+------------+--> Failed
//! ```
//!
//! Local installs finish inside `Requesting` and skip `Tracking`.

use crate::client::SnapdClient;
use crate::config::PollConfig;
use crate::error::Result;
use crate::local::{CliOutput, LocalCli};
use crate::operation::{Intent, Operation, OperationRequest, ResolvedTarget, Submission};
use crate::package::{PackageState, Transition};
use crate::resolver::VersionResolver;
use crate::tracker::{ChangeTracker, Sleeper};
use crate::transport::Transport;
use serde::Serialize;
use snapkit_proto::{Action, Change};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where an operation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Resolving,
    Requesting,
    Tracking,
    Done,
    Failed,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Requesting => "requesting",
            Self::Tracking => "tracking",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub intent: Intent,
    /// Daemon action; `None` for local installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_source: Option<PathBuf>,
    pub targets: Vec<ResolvedTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_output: Option<CliOutput>,
    pub phase: Phase,
}

impl OperationReport {
    fn new(intent: Intent, operation: &Operation<'_>) -> Self {
        let local_source = match operation {
            Operation::LocalInstall { source } => Some(source.to_path_buf()),
            Operation::DaemonChange { .. } => None,
        };
        Self {
            intent,
            action: operation.action(),
            local_source,
            targets: Vec::new(),
            change_id: None,
            change: None,
            cli_output: None,
            phase: Phase::Resolving,
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(intent = self.intent.as_str(), from = %self.phase, to = %phase, "operation phase");
        self.phase = phase;
    }

    /// True when nothing was submitted because no package had a name.
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.phase == Phase::Done
            && self.change_id.is_none()
            && self.cli_output.is_none()
    }
}

/// One row of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPackage {
    #[serde(flatten)]
    pub state: PackageState,
    pub transition: Transition,
}

/// Runs install, upgrade, remove and purge against one daemon.
pub struct Coordinator<'a> {
    transport: &'a dyn Transport,
    cli: &'a dyn LocalCli,
    sleeper: &'a dyn Sleeper,
    poll: PollConfig,
}

impl<'a> Coordinator<'a> {
    #[must_use]
    pub fn new(
        transport: &'a dyn Transport,
        cli: &'a dyn LocalCli,
        sleeper: &'a dyn Sleeper,
        poll: PollConfig,
    ) -> Self {
        Self {
            transport,
            cli,
            sleeper,
            poll,
        }
    }

    #[must_use]
    pub fn client(&self) -> SnapdClient<'a> {
        SnapdClient::new(self.transport)
    }

    fn tracker(&self) -> ChangeTracker<'a> {
        ChangeTracker::new(self.transport, self.poll, self.sleeper)
    }

    pub fn install(&self, request: &OperationRequest) -> Result<OperationReport> {
        self.run(Intent::Install, request)
    }

    pub fn upgrade(&self, request: &OperationRequest) -> Result<OperationReport> {
        self.run(Intent::Upgrade, request)
    }

    pub fn remove(&self, request: &OperationRequest) -> Result<OperationReport> {
        self.run(Intent::Remove, request)
    }

    /// Identical to [`Coordinator::remove`].
    pub fn purge(&self, request: &OperationRequest) -> Result<OperationReport> {
        self.run(Intent::Purge, request)
    }

    /// Carry out `intent` for every named package in `request`.
    ///
    /// Version lookups start from an empty cache on every call.
    pub fn run(&self, intent: Intent, request: &OperationRequest) -> Result<OperationReport> {
        let operation = Operation::select(intent, request);
        let mut report = OperationReport::new(intent, &operation);
        debug!(
            intent = intent.as_str(),
            action = ?report.action,
            packages = request.spec.len(),
            local = report.local_source.is_some(),
            "operation started"
        );

        match self.drive(intent, request, &operation, &mut report) {
            Ok(()) => {
                report.enter(Phase::Done);
                info!(
                    intent = intent.as_str(),
                    targets = report.targets.len(),
                    change_id = ?report.change_id,
                    "operation complete"
                );
                Ok(report)
            }
            Err(err) => {
                report.enter(Phase::Failed);
                debug!(intent = intent.as_str(), code = err.code(), error = %err, "operation failed");
                Err(err)
            }
        }
    }

    fn drive(
        &self,
        intent: Intent,
        request: &OperationRequest,
        operation: &Operation<'_>,
        report: &mut OperationReport,
    ) -> Result<()> {
        let client = self.client();
        let mut resolver = VersionResolver::new(
            client,
            self.cli,
            &request.spec,
            &request.channel,
            request.source.as_deref(),
        );
        report.targets = operation.resolve(intent, &mut resolver)?;

        report.enter(Phase::Requesting);
        match operation.submit(&client, self.cli, request, &report.targets)? {
            Submission::Skipped => {
                debug!(intent = intent.as_str(), "no named packages, nothing submitted");
            }
            Submission::Completed(output) => {
                report.cli_output = Some(output);
            }
            Submission::Change(change_id) => {
                report.change_id = Some(change_id.clone());
                report.enter(Phase::Tracking);
                report.change = Some(self.tracker().wait(&change_id)?);
            }
        }
        Ok(())
    }

    /// Resolve every package and the transition `intent` needs, without
    /// submitting anything.
    pub fn plan(&self, intent: Intent, request: &OperationRequest) -> Result<Vec<PlannedPackage>> {
        let mut resolver = VersionResolver::new(
            self.client(),
            self.cli,
            &request.spec,
            &request.channel,
            request.source.as_deref(),
        );
        (0..request.spec.len())
            .map(|index| {
                let state = resolver.state(index, intent)?;
                let transition = state.transition(intent);
                Ok(PlannedPackage { state, transition })
            })
            .collect()
    }

    /// Track an already submitted change.
    pub fn wait(&self, change_id: &str) -> Result<Change> {
        self.tracker().wait(change_id)
    }

    /// Apply configuration to `name` and wait for the resulting change.
    pub fn set_conf(
        &self,
        name: &str,
        values: &BTreeMap<String, serde_json::Value>,
    ) -> Result<(String, Change)> {
        let change_id = self.client().set_conf(name, values)?;
        debug!(name, change_id = %change_id, keys = values.len(), "configuration submitted");
        let change = self.tracker().wait(&change_id)?;
        Ok((change_id, change))
    }
}
