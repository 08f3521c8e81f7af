//! Single-request transport to the daemon socket.

use crate::config::Config;
use crate::error::{Error, Result};
use snapkit_proto::{decode_envelope, encode_request, split_response, status_line_code, Envelope, Method};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Sends one request to the daemon and returns the decoded envelope.
///
/// Implementations never hand back a partially decoded response: a body that
/// is empty or not valid JSON is an error.
pub trait Transport {
    fn call(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<Envelope>;
}

/// Transport over the daemon's Unix domain socket.
///
/// Opens a fresh connection per call and reads until the daemon closes it.
#[derive(Debug, Clone)]
pub struct UnixTransport {
    socket: PathBuf,
    timeout: Option<Duration>,
}

impl UnixTransport {
    #[must_use]
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.socket.clone()).with_timeout(config.request_timeout)
    }

    /// Bound each socket read and write. A zero duration disables the bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    #[cfg(unix)]
    fn round_trip(&self, request: &[u8]) -> io::Result<Vec<u8>> {
        let mut stream = std::os::unix::net::UnixStream::connect(&self.socket)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        stream.write_all(request)?;
        stream.flush()?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw)?;
        Ok(raw)
    }

    #[cfg(not(unix))]
    fn round_trip(&self, _request: &[u8]) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix domain sockets are not available on this platform",
        ))
    }
}

impl Transport for UnixTransport {
    fn call(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<Envelope> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| Error::malformed(format!("cannot encode request body: {e}")))?;

        debug!(%method, path, socket = %self.socket.display(), "daemon request");
        let request = encode_request(method, path, body.as_deref());

        let raw = self.round_trip(&request).map_err(|e| {
            Error::protocol(
                format!("cannot talk to daemon at {}", self.socket.display()),
                e,
            )
        })?;

        let (headers, body) = split_response(&raw)
            .map_err(|e| Error::protocol(format!("malformed response to {method} {path}"), e))?;
        let envelope = decode_envelope(body)
            .map_err(|e| Error::protocol(format!("undecodable response to {method} {path}"), e))?;

        trace!(
            http_status = ?status_line_code(headers),
            status_code = ?envelope.status_code,
            kind = ?envelope.kind,
            "daemon response"
        );
        Ok(envelope)
    }
}
