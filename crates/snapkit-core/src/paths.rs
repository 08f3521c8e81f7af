use std::path::{Path, PathBuf};

/// Well-known location of the daemon socket.
pub const DEFAULT_SOCKET: &str = "/run/snapd.socket";

/// Environment variable to override the daemon socket (for testing).
pub const SOCKET_ENV: &str = "SNAPKIT_SOCKET";

/// Name of the local CLI tool looked up on `PATH`.
pub const DEFAULT_SNAP_BIN: &str = "snap";

/// Environment variable to override the local CLI tool.
pub const SNAP_BIN_ENV: &str = "SNAPKIT_SNAP_BIN";

/// Get the daemon socket path.
///
/// Respects `SNAPKIT_SOCKET`; an empty value is ignored.
#[must_use]
pub fn socket_path() -> PathBuf {
    match std::env::var(SOCKET_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_SOCKET),
    }
}

/// Get the program used for local-source installs.
///
/// `SNAPKIT_SNAP_BIN` wins. Otherwise `snap` is located on `PATH`; if it
/// cannot be found the bare name is returned and spawning it reports the
/// failure.
#[must_use]
pub fn cli_program() -> PathBuf {
    if let Ok(program) = std::env::var(SNAP_BIN_ENV) {
        if !program.is_empty() {
            return PathBuf::from(program);
        }
    }
    which::which(DEFAULT_SNAP_BIN).unwrap_or_else(|_| PathBuf::from(DEFAULT_SNAP_BIN))
}

/// Whether a local package source exists and is a regular file.
#[must_use]
pub fn is_local_source(path: &Path) -> bool {
    path.is_file()
}
