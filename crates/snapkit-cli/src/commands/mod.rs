pub mod conf;
pub mod install;
pub mod list;
pub mod status;
pub mod version;
pub mod wait;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use snapkit_core::{
    Config, Coordinator, Error, SnapCli, SnapdClient, ThreadSleeper, UnixTransport,
};

/// Failure shape shared by every command's JSON output.
#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<serde_json::Value>,
}

/// Daemon connection and local tool for one command.
pub struct Session {
    transport: UnixTransport,
    cli: SnapCli,
    sleeper: ThreadSleeper,
    config: Config,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            transport: UnixTransport::from_config(config),
            cli: SnapCli::new(config.cli_program.clone()),
            sleeper: ThreadSleeper,
            config: config.clone(),
        }
    }

    pub fn coordinator(&self) -> Coordinator<'_> {
        Coordinator::new(&self.transport, &self.cli, &self.sleeper, self.config.poll)
    }

    pub fn client(&self) -> SnapdClient<'_> {
        SnapdClient::new(&self.transport)
    }
}

/// Structured payload worth showing next to the message.
fn detail(err: &Error) -> Option<serde_json::Value> {
    match err {
        Error::PackageNotFound { detail, .. } | Error::OperationFailed { detail, .. }
            if !detail.is_null() =>
        {
            Some(detail.clone())
        }
        Error::Daemon { kind, .. } => kind.as_ref().map(|k| serde_json::json!({ "kind": k })),
        Error::CliInvocation { stdout, stderr, .. } => {
            Some(serde_json::json!({ "stdout": stdout, "stderr": stderr }))
        }
        _ => None,
    }
}

/// Report `err` and fail the command.
///
/// With `--json` the error is printed to stdout and the process exits 1;
/// otherwise it becomes a diagnostic, which also exits 1.
pub fn fail<T>(err: Error, json: bool) -> Result<T> {
    if json {
        let result = ErrorResult {
            ok: false,
            code: err.code(),
            error: err.to_string(),
            detail: detail(&err),
        };
        println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
        std::process::exit(1);
    }

    match &err {
        Error::CliInvocation { stderr, .. } if !stderr.trim().is_empty() => {
            eprintln!("{}", stderr.trim_end());
        }
        Error::Protocol { .. } => {
            eprintln!("hint: is snapd running? set --socket or SNAPKIT_SOCKET to use another socket");
        }
        _ => {}
    }
    Err(err).into_diagnostic()
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Parse `key=value`. The value is read as JSON when it parses, else taken
/// as a plain string.
pub fn parse_assignment(raw: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
