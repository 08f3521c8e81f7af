#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Wire types for talking to the snap daemon.
//!
//! The daemon speaks a small subset of HTTP/1.0 over a Unix domain socket.
//! Every exchange is a single request on a fresh connection; the daemon
//! writes its response and closes the socket.
//!
//! ## Wire format
//! Request:
//! - `METHOD PATH HTTP/1.0` request line
//! - `Accept` and `Content-Type` headers (both `application/json`)
//! - `Content-Length` whenever a body follows
//! - blank line, then the JSON body
//!
//! Response: a header block and a JSON body separated by the first blank
//! line. The body is always an [`Envelope`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

/// REST API version spoken by this crate.
pub const API_VERSION: &str = "v2";

/// Path prefix shared by every endpoint.
pub const API_PREFIX: &str = "/v2";

/// Media type sent in both `Accept` and `Content-Type`.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Track prepended to bare risk-level channel names.
pub const DEFAULT_TRACK: &str = "latest";

/// Kinds reported in the `kind` field of error results.
pub mod kinds {
    pub const SNAP_NOT_FOUND: &str = "snap-not-found";
    pub const SNAP_NOT_INSTALLED: &str = "snap-not-installed";
}

/// HTTP method used for a daemon call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a request into the bytes written to the socket.
#[must_use]
pub fn encode_request(method: Method, path: &str, body: Option<&[u8]>) -> Vec<u8> {
    let mut head = format!(
        "{method} {path} HTTP/1.0\r\nAccept: {JSON_MEDIA_TYPE}\r\nContent-Type: {JSON_MEDIA_TYPE}\r\n"
    );
    if let Some(body) = body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    let mut buf = head.into_bytes();
    if let Some(body) = body {
        buf.extend_from_slice(body);
    }
    buf
}

/// Split a raw response into its header block and body.
///
/// The split happens at the first blank line. Bare `\n\n` is accepted as
/// well as `\r\n\r\n`, whichever comes first.
///
/// # Errors
/// Returns `InvalidData` if the response has no blank line.
pub fn split_response(raw: &[u8]) -> io::Result<(&[u8], &[u8])> {
    let crlf = find(raw, b"\r\n\r\n").map(|at| (at, 4));
    let lf = find(raw, b"\n\n").map(|at| (at, 2));

    let (at, sep) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response has no header/body boundary",
            ))
        }
    };

    Ok((&raw[..at], &raw[at + sep..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode a response body into an [`Envelope`].
///
/// # Errors
/// Returns `InvalidData` if the body is empty or not a valid envelope.
pub fn decode_envelope(body: &[u8]) -> io::Result<Envelope> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "response body is empty",
        ));
    }
    serde_json::from_slice(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Parse the status code out of the first line of a header block.
#[must_use]
pub fn status_line_code(headers: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(headers).ok()?;
    let line = text.lines().next()?;
    let mut parts = line.split_whitespace();
    let proto = parts.next()?;
    if !proto.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Discriminator of a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Sync,
    Async,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Top-level response from the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: ResponseType,
    #[serde(rename = "status-code", default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub result: serde_json::Value,
    /// Change id, present on async responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
}

impl Envelope {
    /// Whether the daemon reported success.
    ///
    /// An error-typed envelope is never a success. Otherwise the status code
    /// decides, and an envelope without one counts as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        if self.kind == ResponseType::Error {
            return false;
        }
        self.status_code
            .map_or(true, |code| (200..300).contains(&code))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Whether the daemon says the snap is absent, by status code or by
    /// error kind.
    #[must_use]
    pub fn is_not_installed(&self) -> bool {
        if self.is_not_found() {
            return true;
        }
        self.is_error()
            && self.error_result().and_then(|e| e.kind).is_some_and(|kind| {
                kind == kinds::SNAP_NOT_FOUND || kind == kinds::SNAP_NOT_INSTALLED
            })
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == ResponseType::Error
    }

    /// Decode `result` into a typed value.
    ///
    /// # Errors
    /// Returns an error if `result` does not match `T`.
    pub fn decode_result<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.result)
    }

    /// Error details from `result`, if it has the error shape.
    #[must_use]
    pub fn error_result(&self) -> Option<ErrorResult> {
        self.decode_result().ok()
    }
}

/// `result` of an error-typed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ErrorResult {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Lifecycle bucket of a change status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePhase {
    Pending,
    Succeeded,
    Failed,
}

/// Classify a daemon change status.
///
/// Unrecognized statuses are `Pending`.
#[must_use]
pub fn classify_status(status: &str) -> ChangePhase {
    match status {
        "Done" => ChangePhase::Succeeded,
        "Abort" | "Hold" | "Error" => ChangePhase::Failed,
        _ => ChangePhase::Pending,
    }
}

/// Whether a status is one the daemon is documented to report while a change
/// is still running.
#[must_use]
pub fn is_known_pending_status(status: &str) -> bool {
    matches!(status, "Do" | "Doing" | "Undo" | "Undoing")
}

/// `result` of `GET /v2/changes/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Change {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    /// Remaining fields (tasks, timestamps, data), kept for diagnostics.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Change {
    #[must_use]
    pub fn phase(&self) -> ChangePhase {
        classify_status(&self.status)
    }
}

/// One channel entry in a `find` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChannelRelease {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(rename = "released-at", default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,
}

/// One element of the `GET /v2/find` result array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FoundSnap {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelRelease>,
}

impl FoundSnap {
    /// The release published on `channel`.
    #[must_use]
    pub fn release(&self, channel: &str) -> Option<&ChannelRelease> {
        self.channels.get(channel_key(channel).as_ref())
    }
}

/// Key of `channel` in a `channels` map.
///
/// Bare risk levels (`stable`, `edge`) live under the default track; a
/// channel that already names a track is used as-is.
#[must_use]
pub fn channel_key(channel: &str) -> Cow<'_, str> {
    if channel.contains('/') {
        Cow::Borrowed(channel)
    } else {
        Cow::Owned(format!("{DEFAULT_TRACK}/{channel}"))
    }
}

/// `result` of `GET /v2/snaps/{name}`, and one element of `GET /v2/snaps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Snap {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(rename = "tracking-channel", default, skip_serializing_if = "Option::is_none")]
    pub tracking_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    #[serde(default)]
    pub devmode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Change actions accepted by `POST /v2/snaps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Refresh,
    Remove,
    Revert,
    Enable,
    Disable,
    Switch,
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Refresh => "refresh",
            Self::Remove => "remove",
            Self::Revert => "revert",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Switch => "switch",
        }
    }

    /// Whether requests for this action carry a channel.
    #[must_use]
    pub fn carries_channel(&self) -> bool {
        matches!(self, Self::Install | Self::Refresh | Self::Switch)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// Body of `POST /v2/snaps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub action: Action,
    pub snaps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub classic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub devmode: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub jailmode: bool,
    #[serde(rename = "ignore-validation", default, skip_serializing_if = "is_false")]
    pub ignore_validation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Caller options this crate does not model; the daemon judges them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChangeRequest {
    #[must_use]
    pub fn new(action: Action, snaps: Vec<String>) -> Self {
        Self {
            action,
            snaps,
            channel: None,
            classic: false,
            devmode: false,
            jailmode: false,
            ignore_validation: false,
            revision: None,
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_is_stable() {
        assert_eq!(API_VERSION, "v2");
        assert!(API_PREFIX.ends_with(API_VERSION));
    }

    #[test]
    fn test_encode_get_has_no_content_length() {
        let bytes = encode_request(Method::Get, "/v2/snaps/foo", None);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("GET /v2/snaps/foo HTTP/1.0\r\n"));
        assert!(text.contains("Accept: application/json\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(!text.contains("Content-Length"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_encode_post_counts_body_bytes() {
        let body = "{\"snaps\":[\"héllo\"]}".as_bytes();
        let bytes = encode_request(Method::Post, "/v2/snaps", Some(body));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(text.ends_with("{\"snaps\":[\"héllo\"]}"));
        // Byte length, not char length.
        assert_ne!(body.len(), "{\"snaps\":[\"héllo\"]}".chars().count());
    }

    #[test]
    fn test_split_response_crlf() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n\r\n{\"type\":\"sync\"}";
        let (headers, body) = split_response(raw).unwrap();
        assert!(headers.starts_with(b"HTTP/1.0 200 OK"));
        assert_eq!(body, b"{\"type\":\"sync\"}");
        assert_eq!(status_line_code(headers), Some(200));
    }

    #[test]
    fn test_split_response_bare_newlines() {
        let raw = b"HTTP/1.0 404 Not Found\n\n{}";
        let (headers, body) = split_response(raw).unwrap();
        assert_eq!(status_line_code(headers), Some(404));
        assert_eq!(body, b"{}");
    }

    #[test]
    fn test_split_response_without_boundary_fails() {
        let err = split_response(b"HTTP/1.0 200 OK\r\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_split_keeps_blank_lines_inside_body() {
        let raw = b"HTTP/1.0 200 OK\r\n\r\n{\"a\":\"x\\n\\ny\"}\r\n\r\n";
        let (_, body) = split_response(raw).unwrap();
        assert!(body.starts_with(b"{\"a\""));
    }

    #[test]
    fn test_decode_empty_body_fails() {
        assert!(decode_envelope(b"").is_err());
        assert!(decode_envelope(b"  \r\n").is_err());
    }

    #[test]
    fn test_decode_malformed_body_fails() {
        let err = decode_envelope(b"{\"type\": \"sync\",").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_decode_async_envelope() {
        let env = decode_envelope(
            br#"{"type":"async","status-code":202,"status":"Accepted","result":null,"change":"42"}"#,
        )
        .unwrap();
        assert_eq!(env.kind, ResponseType::Async);
        assert_eq!(env.change.as_deref(), Some("42"));
        assert!(env.is_success());
    }

    #[test]
    fn test_envelope_without_type_uses_status_code() {
        let env = decode_envelope(br#"{"status-code":404}"#).unwrap();
        assert_eq!(env.kind, ResponseType::Unknown);
        assert!(!env.is_success());
        assert!(env.is_not_found());
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let env = decode_envelope(br#"{"type":"stream","status-code":200}"#).unwrap();
        assert_eq!(env.kind, ResponseType::Unknown);
        assert!(env.is_success());
    }

    #[test]
    fn test_error_envelope_details() {
        let env = decode_envelope(
            br#"{"type":"error","status-code":400,"status":"Bad Request","result":{"message":"snap \"foo\" requires classic confinement","kind":"snap-needs-classic","value":"foo"}}"#,
        )
        .unwrap();
        assert!(env.is_error());
        assert!(!env.is_success());
        let err = env.error_result().unwrap();
        assert_eq!(err.kind.as_deref(), Some("snap-needs-classic"));
        assert!(err.message.contains("classic"));
        assert!(!env.is_not_installed());
    }

    #[test]
    fn test_not_installed_by_status_or_kind() {
        let by_status = decode_envelope(br#"{"status-code":404}"#).unwrap();
        assert!(by_status.is_not_installed());

        let by_kind = decode_envelope(
            br#"{"type":"error","status-code":400,"status":"Bad Request","result":{"message":"snap \"bar\" is not installed","kind":"snap-not-installed"}}"#,
        )
        .unwrap();
        assert!(by_kind.is_not_installed());

        let ok = decode_envelope(br#"{"type":"sync","status-code":200,"result":{"kind":"snap-not-found"}}"#).unwrap();
        assert!(!ok.is_not_installed());
    }

    #[test]
    fn test_classify_status() {
        for status in ["Do", "Doing", "Undo", "Undoing"] {
            assert_eq!(classify_status(status), ChangePhase::Pending);
            assert!(is_known_pending_status(status));
        }
        assert_eq!(classify_status("Done"), ChangePhase::Succeeded);
        for status in ["Abort", "Hold", "Error"] {
            assert_eq!(classify_status(status), ChangePhase::Failed);
        }
        assert_eq!(classify_status("Wait"), ChangePhase::Pending);
        assert!(!is_known_pending_status("Wait"));
    }

    #[test]
    fn test_find_result_release_lookup() {
        let env = decode_envelope(
            br#"{"type":"sync","status-code":200,"result":[{"name":"hello","version":"2.10","channels":{"latest/stable":{"version":"2.10","revision":"38","confinement":"strict"},"3.x/edge":{"version":"3.0-rc1"}}}]}"#,
        )
        .unwrap();
        let found: Vec<FoundSnap> = env.decode_result().unwrap();
        assert_eq!(found[0].release("stable").unwrap().version, "2.10");
        assert_eq!(found[0].release("3.x/edge").unwrap().version, "3.0-rc1");
        assert!(found[0].release("beta").is_none());
    }

    #[test]
    fn test_change_keeps_unmodeled_fields() {
        let env = decode_envelope(
            br#"{"type":"sync","status-code":200,"result":{"id":"12","kind":"install-snap","summary":"Install \"hello\" snap","status":"Doing","ready":false,"spawn-time":"2024-01-01T00:00:00Z","tasks":[{"kind":"download-snap","status":"Done"}]}}"#,
        )
        .unwrap();
        let change: Change = env.decode_result().unwrap();
        assert_eq!(change.phase(), ChangePhase::Pending);
        assert_eq!(change.extra["tasks"][0]["kind"], "download-snap");

        let back = serde_json::to_value(&change).unwrap();
        assert_eq!(back["spawn-time"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_channel_key() {
        assert_eq!(channel_key("stable"), "latest/stable");
        assert_eq!(channel_key("2.x/candidate"), "2.x/candidate");
    }

    #[test]
    fn test_snap_result_decodes() {
        let env = decode_envelope(
            br#"{"type":"sync","status-code":200,"result":{"name":"core","version":"16-2.61","revision":"16928","tracking-channel":"latest/stable","confinement":"strict","devmode":false,"status":"active"}}"#,
        )
        .unwrap();
        let snap: Snap = env.decode_result().unwrap();
        assert_eq!(snap.version, "16-2.61");
        assert_eq!(snap.tracking_channel.as_deref(), Some("latest/stable"));
    }

    #[test]
    fn test_action_channel_rules() {
        assert!(Action::Install.carries_channel());
        assert!(Action::Refresh.carries_channel());
        assert!(Action::Switch.carries_channel());
        for action in [Action::Remove, Action::Revert, Action::Enable, Action::Disable] {
            assert!(!action.carries_channel(), "{action} should not carry a channel");
        }
    }

    #[test]
    fn test_change_request_omits_unset_fields() {
        let req = ChangeRequest::new(Action::Remove, vec!["foo".to_string()]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"action": "remove", "snaps": ["foo"]}));
    }

    #[test]
    fn test_change_request_serializes_flags() {
        let mut req = ChangeRequest::new(Action::Install, vec!["foo".to_string()]);
        req.channel = Some("stable".to_string());
        req.ignore_validation = true;
        req.revision = Some("12".to_string());
        req.extra
            .insert("unaliased".to_string(), serde_json::Value::Bool(true));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["ignore-validation"], true);
        assert_eq!(json["revision"], "12");
        assert_eq!(json["unaliased"], true);
        assert!(json.get("classic").is_none());
    }
}
