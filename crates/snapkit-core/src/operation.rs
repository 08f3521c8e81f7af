//! What a single invocation asks for, and how it is carried out.

use crate::client::SnapdClient;
use crate::error::Result;
use crate::local::{self, CliOutput, LocalCli};
use crate::package::PackageSpec;
use crate::request::{build_change_request, OptionSet};
use crate::resolver::VersionResolver;
use serde::Serialize;
use snapkit_proto::Action;
use std::path::{Path, PathBuf};

/// Channel used when the caller names none.
pub const DEFAULT_CHANNEL: &str = "stable";

/// Desired-state change requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Install,
    Upgrade,
    Remove,
    /// Same as `Remove`; the daemon has no separate purge.
    Purge,
}

impl Intent {
    /// Daemon action carrying out this intent.
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Self::Install => Action::Install,
            Self::Upgrade => Action::Refresh,
            Self::Remove | Self::Purge => Action::Remove,
        }
    }

    /// Removal resolves installed versions; everything else resolves
    /// available ones.
    #[must_use]
    pub fn resolves_installed(self) -> bool {
        matches!(self, Self::Remove | Self::Purge)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Remove => "remove",
            Self::Purge => "purge",
        }
    }
}

/// Attributes of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub spec: PackageSpec,
    pub channel: String,
    pub options: OptionSet,
    pub revision: Option<String>,
    /// Local package file; selects the local install path.
    pub source: Option<PathBuf>,
}

impl OperationRequest {
    #[must_use]
    pub fn new(spec: PackageSpec) -> Self {
        Self {
            spec,
            channel: DEFAULT_CHANNEL.to_string(),
            options: OptionSet::new(),
            revision: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<PathBuf>) -> Self {
        self.source = source;
        self
    }
}

/// A package resolved for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub index: usize,
    pub name: String,
    /// Available version (install/upgrade) or installed version (remove).
    pub version: Option<String>,
}

/// Outcome of the request phase.
#[derive(Debug)]
pub enum Submission {
    /// The daemon accepted a change that still has to be tracked.
    Change(String),
    /// The work finished synchronously.
    Completed(CliOutput),
    /// There was nothing to submit.
    Skipped,
}

/// How an invocation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'r> {
    /// Change request to the daemon, tracked until terminal.
    DaemonChange { action: Action },
    /// Synchronous `install <path>` through the local CLI tool.
    LocalInstall { source: &'r Path },
}

impl<'r> Operation<'r> {
    /// Install and upgrade with a source go through the local CLI tool;
    /// everything else goes to the daemon.
    #[must_use]
    pub fn select(intent: Intent, request: &'r OperationRequest) -> Self {
        match (&request.source, intent) {
            (Some(source), Intent::Install | Intent::Upgrade) => Self::LocalInstall {
                source: source.as_path(),
            },
            _ => Self::DaemonChange {
                action: intent.action(),
            },
        }
    }

    /// Resolve the version of every named package.
    ///
    /// Local installs resolve nothing.
    pub fn resolve(
        &self,
        intent: Intent,
        resolver: &mut VersionResolver<'_>,
    ) -> Result<Vec<ResolvedTarget>> {
        if let Self::LocalInstall { .. } = self {
            return Ok(Vec::new());
        }

        let spec = resolver.spec();
        let mut targets = Vec::new();
        for index in spec.named_indices() {
            let version = if intent.resolves_installed() {
                resolver.installed_version(index)?
            } else {
                resolver.available_version(index)?
            };
            if let Some(name) = spec.entry(index).and_then(|e| e.name.clone()) {
                targets.push(ResolvedTarget {
                    index,
                    name,
                    version,
                });
            }
        }
        Ok(targets)
    }

    /// Send the request: a daemon change, or the local install itself.
    pub fn submit(
        &self,
        client: &SnapdClient<'_>,
        cli: &dyn LocalCli,
        request: &OperationRequest,
        targets: &[ResolvedTarget],
    ) -> Result<Submission> {
        match *self {
            Self::LocalInstall { source } => {
                local::install(cli, source, &request.options).map(Submission::Completed)
            }
            Self::DaemonChange { .. } if targets.is_empty() => Ok(Submission::Skipped),
            Self::DaemonChange { action } => {
                let names: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
                let payload = build_change_request(
                    &names,
                    action,
                    &request.channel,
                    &request.options,
                    request.revision.as_deref(),
                );
                client.submit(&payload).map(Submission::Change)
            }
        }
    }

    #[must_use]
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::DaemonChange { action } => Some(*action),
            Self::LocalInstall { .. } => None,
        }
    }
}
