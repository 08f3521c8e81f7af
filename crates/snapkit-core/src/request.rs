//! Change request payloads and async response handling.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use snapkit_proto::{Action, ChangeRequest, Envelope};
use std::collections::BTreeMap;

/// Option names that map onto dedicated request fields.
pub mod flags {
    pub const CLASSIC: &str = "classic";
    pub const DEVMODE: &str = "devmode";
    pub const JAILMODE: &str = "jailmode";
    pub const IGNORE_VALIDATION: &str = "ignore-validation";
    /// Only meaningful for local-source installs.
    pub const DANGEROUS: &str = "dangerous";

    pub const ALL: [&str; 4] = [CLASSIC, DEVMODE, JAILMODE, IGNORE_VALIDATION];

    /// Request fields set by the builder itself; never taken from options.
    pub const RESERVED: [&str; 4] = ["action", "snaps", "channel", "revision"];
}

/// Caller-supplied options, keyed by name.
///
/// Keys are never validated here. An option counts as set when it is present
/// and neither `null` nor `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeMap<String, serde_json::Value>);

impl OptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        !matches!(
            self.0.get(key),
            None | Some(serde_json::Value::Null | serde_json::Value::Bool(false))
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build the body of `POST /v2/snaps`.
///
/// The channel is included only for actions that carry one. Each flag is
/// included only when its option is set. Options this crate does not model
/// are passed through so the daemon can judge them, except keys naming a
/// field the builder sets ([`flags::RESERVED`]). No combination of fields
/// is rejected here.
#[must_use]
pub fn build_change_request(
    names: &[String],
    action: Action,
    channel: &str,
    options: &OptionSet,
    revision: Option<&str>,
) -> ChangeRequest {
    let mut request = ChangeRequest::new(action, names.to_vec());

    if action.carries_channel() {
        request.channel = Some(channel.to_string());
    }
    request.classic = options.is_set(flags::CLASSIC);
    request.devmode = options.is_set(flags::DEVMODE);
    request.jailmode = options.is_set(flags::JAILMODE);
    request.ignore_validation = options.is_set(flags::IGNORE_VALIDATION);
    request.revision = revision.map(str::to_string);

    for (key, value) in options.iter() {
        let name = key.as_str();
        if flags::ALL.contains(&name) || flags::RESERVED.contains(&name) || name == flags::DANGEROUS {
            continue;
        }
        request.extra.insert(key.clone(), value.clone());
    }

    request
}

/// Build the body of `PUT /v2/snaps/{name}/conf`.
#[must_use]
pub fn build_conf_request(values: &BTreeMap<String, serde_json::Value>) -> serde_json::Value {
    serde_json::Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

/// Extract the change id from the response to a change submission.
///
/// An error-typed response becomes [`Error::Daemon`] carrying the daemon's
/// status, kind and message.
pub fn extract_change_id(envelope: &Envelope) -> Result<String> {
    if envelope.is_error() || !envelope.is_success() {
        return Err(Error::from_envelope(envelope));
    }
    envelope
        .change
        .clone()
        .ok_or_else(|| Error::malformed("async response has no change id"))
}
