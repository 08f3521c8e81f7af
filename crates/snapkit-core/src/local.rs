//! Local CLI tool, used when installing from a package file.

use crate::error::{Error, Result};
use crate::request::{flags, OptionSet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Captured result of one CLI invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CliOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CliOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the local package CLI synchronously.
pub trait LocalCli {
    /// Run with `args` and capture the result. A non-zero exit is not an
    /// error at this level.
    fn run(&self, args: &[String]) -> Result<CliOutput>;

    /// Human-readable command line, for diagnostics.
    fn describe(&self, args: &[String]) -> String;
}

/// [`LocalCli`] backed by a real executable.
#[derive(Debug, Clone)]
pub struct SnapCli {
    program: PathBuf,
}

impl SnapCli {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl LocalCli for SnapCli {
    fn run(&self, args: &[String]) -> Result<CliOutput> {
        debug!(program = %self.program.display(), ?args, "running local cli");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| Error::CliSpawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(CliOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn describe(&self, args: &[String]) -> String {
        let mut line = self.program.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Extract the token after the `version:` label in `info` output.
#[must_use]
pub fn parse_info_version(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("version:")?;
        rest.split_whitespace().next().map(str::to_string)
    })
}

/// Run `info <path>` and return the version it reports.
pub fn info_version(cli: &dyn LocalCli, source: &Path) -> Result<String> {
    let args = vec!["info".to_string(), source.display().to_string()];
    let output = cli.run(&args)?;
    if !output.success() {
        return Err(Error::CliInvocation {
            command: cli.describe(&args),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    parse_info_version(&output.stdout).ok_or_else(|| Error::VersionParse {
        source_path: source.to_path_buf(),
        output: output.stdout,
    })
}

/// Arguments for `install <path>`, with a flag per set option.
#[must_use]
pub fn install_args(source: &Path, options: &OptionSet) -> Vec<String> {
    let mut args = vec!["install".to_string()];
    for flag in [flags::CLASSIC, flags::DEVMODE, flags::JAILMODE, flags::DANGEROUS] {
        if options.is_set(flag) {
            args.push(format!("--{flag}"));
        }
    }
    args.push(source.display().to_string());
    args
}

/// Run `install <path>`; a non-zero exit is [`Error::CliInvocation`].
pub fn install(cli: &dyn LocalCli, source: &Path, options: &OptionSet) -> Result<CliOutput> {
    let args = install_args(source, options);
    let output = cli.run(&args)?;
    if !output.success() {
        return Err(Error::CliInvocation {
            command: cli.describe(&args),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }
    Ok(output)
}
