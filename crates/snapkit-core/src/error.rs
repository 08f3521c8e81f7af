use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, one per [`Error`] variant.
pub mod codes {
    pub const PROTOCOL_ERROR: &str = "PROTOCOL_ERROR";
    pub const DAEMON_ERROR: &str = "DAEMON_ERROR";
    pub const PACKAGE_NOT_FOUND: &str = "PACKAGE_NOT_FOUND";
    pub const VERSION_PARSE_ERROR: &str = "VERSION_PARSE_ERROR";
    pub const OPERATION_FAILED: &str = "OPERATION_FAILED";
    pub const OPERATION_TIMEOUT: &str = "OPERATION_TIMEOUT";
    pub const CLI_INVOCATION_FAILED: &str = "CLI_INVOCATION_FAILED";
    pub const CLI_SPAWN_FAILED: &str = "CLI_SPAWN_FAILED";
    pub const INVALID_SPEC: &str = "INVALID_SPEC";
}

/// Errors raised while talking to the daemon or the local CLI tool.
///
/// Every variant is fatal to the operation in progress. Nothing here is
/// retried; callers decide whether to try again.
#[derive(Error, Debug)]
pub enum Error {
    /// The socket was unreachable or the response could not be decoded.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The daemon answered with an error-typed response.
    #[error("daemon error ({status_code} {status}): {message}")]
    Daemon {
        status_code: u16,
        status: String,
        kind: Option<String>,
        message: String,
    },

    /// `find` returned a non-success status for this package.
    #[error("package not found: {name}")]
    PackageNotFound {
        name: String,
        detail: serde_json::Value,
    },

    /// `snap info` output for a local source had no `version:` line.
    #[error("no version found in info output for {}", .source_path.display())]
    VersionParse { source_path: PathBuf, output: String },

    /// The change reached Abort, Hold or Error.
    #[error("change {change_id} finished with status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    OperationFailed {
        change_id: String,
        status: String,
        message: Option<String>,
        detail: serde_json::Value,
    },

    /// The change was still running after the last allowed poll.
    #[error("change {change_id} did not finish after {attempts} polls")]
    OperationTimeout { change_id: String, attempts: u32 },

    /// The local CLI tool exited unsuccessfully.
    #[error("`{command}` failed{}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    CliInvocation {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The local CLI tool could not be started.
    #[error("failed to run {}: {source}", .program.display())]
    CliSpawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid package spec: {0}")]
    InvalidSpec(String),
}

impl Error {
    /// Protocol error wrapping an I/O failure.
    pub fn protocol(message: impl Into<String>, source: io::Error) -> Self {
        Self::Protocol {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Protocol error with no underlying I/O failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Build a `Daemon` error from a non-success envelope.
    #[must_use]
    pub fn from_envelope(envelope: &snapkit_proto::Envelope) -> Self {
        let details = envelope.error_result().unwrap_or_default();
        let message = if details.message.is_empty() {
            envelope.result.to_string()
        } else {
            details.message
        };
        Self::Daemon {
            status_code: envelope.status_code.unwrap_or_default(),
            status: envelope.status.clone().unwrap_or_default(),
            kind: details.kind,
            message,
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => codes::PROTOCOL_ERROR,
            Self::Daemon { .. } => codes::DAEMON_ERROR,
            Self::PackageNotFound { .. } => codes::PACKAGE_NOT_FOUND,
            Self::VersionParse { .. } => codes::VERSION_PARSE_ERROR,
            Self::OperationFailed { .. } => codes::OPERATION_FAILED,
            Self::OperationTimeout { .. } => codes::OPERATION_TIMEOUT,
            Self::CliInvocation { .. } => codes::CLI_INVOCATION_FAILED,
            Self::CliSpawn { .. } => codes::CLI_SPAWN_FAILED,
            Self::InvalidSpec(_) => codes::INVALID_SPEC,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
