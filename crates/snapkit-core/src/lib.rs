#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod operation;
pub mod package;
pub mod paths;
pub mod request;
pub mod resolver;
pub mod tracker;
pub mod transport;
pub mod version;

#[cfg(test)]
mod testing;

pub use client::SnapdClient;
pub use config::{Config, PollConfig};
pub use coordinator::{Coordinator, OperationReport, Phase, PlannedPackage};
pub use error::{codes, Error, Result};
pub use local::{CliOutput, LocalCli, SnapCli};
pub use operation::{Intent, OperationRequest, ResolvedTarget, DEFAULT_CHANNEL};
pub use package::{PackageEntry, PackageSpec, PackageState, Transition};
pub use request::OptionSet;
pub use resolver::VersionResolver;
pub use tracker::{ChangeTracker, Sleeper, ThreadSleeper};
pub use transport::{Transport, UnixTransport};
pub use version::VERSION;
