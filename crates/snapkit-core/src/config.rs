use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Delay between change status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls before a change is declared timed out (five minutes at the default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// Read/write timeout on the daemon socket.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How often and how long a change is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping between polls.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Runtime configuration for snapkit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Daemon socket path.
    pub socket: PathBuf,

    /// Local CLI tool used for installs from a file.
    pub cli_program: PathBuf,

    /// Change polling.
    pub poll: PollConfig,

    /// Read/write timeout for one daemon round trip.
    pub request_timeout: Duration,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: paths::socket_path(),
            cli_program: paths::cli_program(),
            poll: PollConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a config talking to the given socket.
    #[must_use]
    pub fn new(socket: PathBuf) -> Self {
        Self {
            socket,
            ..Default::default()
        }
    }

    /// Point at a different daemon socket.
    #[must_use]
    pub fn with_socket(mut self, socket: PathBuf) -> Self {
        self.socket = socket;
        self
    }

    /// Set the local CLI tool.
    #[must_use]
    pub fn with_cli_program(mut self, program: PathBuf) -> Self {
        self.cli_program = program;
        self
    }

    /// Set change polling.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the per-request socket timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}
