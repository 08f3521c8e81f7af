//! Typed access to the daemon endpoints.
//!
//! Each call decodes the envelope's `result` into the endpoint's type right
//! away, so nothing downstream walks raw JSON.

use crate::error::{Error, Result};
use crate::request::{build_conf_request, extract_change_id};
use crate::transport::Transport;
use snapkit_proto::{Change, ChangeRequest, Envelope, FoundSnap, Method, Snap, API_PREFIX};
use std::collections::BTreeMap;
use url::form_urlencoded;

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode<T: serde::de::DeserializeOwned>(envelope: &Envelope, what: &str) -> Result<T> {
    envelope
        .decode_result()
        .map_err(|e| Error::malformed(format!("unexpected {what} result: {e}")))
}

/// Daemon API client over any [`Transport`].
#[derive(Clone, Copy)]
pub struct SnapdClient<'a> {
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for SnapdClient<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapdClient").finish_non_exhaustive()
    }
}

impl<'a> SnapdClient<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// `GET /v2/changes/{id}`.
    pub fn change(&self, id: &str) -> Result<Change> {
        let path = format!("{API_PREFIX}/changes/{}", encode(id));
        let envelope = self.transport.call(Method::Get, &path, None)?;
        if !envelope.is_success() {
            return Err(Error::from_envelope(&envelope));
        }
        decode(&envelope, "change")
    }

    /// `GET /v2/find?name={name}`.
    ///
    /// A non-success status becomes [`Error::PackageNotFound`] carrying the
    /// daemon's result payload.
    pub fn find(&self, name: &str) -> Result<Vec<FoundSnap>> {
        let path = format!("{API_PREFIX}/find?name={}", encode(name));
        let envelope = self.transport.call(Method::Get, &path, None)?;
        if !envelope.is_success() {
            return Err(Error::PackageNotFound {
                name: name.to_string(),
                detail: envelope.result,
            });
        }
        decode(&envelope, "find")
    }

    /// `GET /v2/snaps/{name}`; `None` when the snap is not installed.
    pub fn snap(&self, name: &str) -> Result<Option<Snap>> {
        let path = format!("{API_PREFIX}/snaps/{}", encode(name));
        let envelope = self.transport.call(Method::Get, &path, None)?;
        if envelope.is_not_installed() {
            return Ok(None);
        }
        if !envelope.is_success() {
            return Err(Error::from_envelope(&envelope));
        }
        decode(&envelope, "snap").map(Some)
    }

    /// `GET /v2/snaps`.
    pub fn snaps(&self) -> Result<Vec<Snap>> {
        let envelope = self
            .transport
            .call(Method::Get, &format!("{API_PREFIX}/snaps"), None)?;
        if !envelope.is_success() {
            return Err(Error::from_envelope(&envelope));
        }
        decode(&envelope, "snaps")
    }

    /// `GET /v2/snaps/{name}/conf`, optionally restricted to `keys`.
    pub fn conf(
        &self,
        name: &str,
        keys: &[String],
    ) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut path = format!("{API_PREFIX}/snaps/{}/conf", encode(name));
        if !keys.is_empty() {
            let keys: Vec<String> = keys.iter().map(|k| encode(k)).collect();
            path.push_str("?keys=");
            path.push_str(&keys.join(","));
        }
        let envelope = self.transport.call(Method::Get, &path, None)?;
        if !envelope.is_success() {
            return Err(Error::from_envelope(&envelope));
        }
        decode(&envelope, "conf")
    }

    /// `PUT /v2/snaps/{name}/conf`; returns the change id.
    pub fn set_conf(
        &self,
        name: &str,
        values: &BTreeMap<String, serde_json::Value>,
    ) -> Result<String> {
        let path = format!("{API_PREFIX}/snaps/{}/conf", encode(name));
        let body = build_conf_request(values);
        let envelope = self.transport.call(Method::Put, &path, Some(&body))?;
        extract_change_id(&envelope)
    }

    /// `POST /v2/snaps`; returns the change id.
    pub fn submit(&self, request: &ChangeRequest) -> Result<String> {
        let body = serde_json::to_value(request)
            .map_err(|e| Error::malformed(format!("cannot encode change request: {e}")))?;
        let envelope = self
            .transport
            .call(Method::Post, &format!("{API_PREFIX}/snaps"), Some(&body))?;
        extract_change_id(&envelope)
    }
}
