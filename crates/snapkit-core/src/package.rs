//! Requested packages and their resolved state.

use crate::error::{Error, Result};
use crate::operation::Intent;
use serde::Serialize;
use std::str::FromStr;

/// One requested package: an optional name and an optional target version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PackageEntry {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl PackageEntry {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: None,
        }
    }
}

/// `name` or `name=version`.
impl FromStr for PackageEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = match s.split_once('=') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(Error::InvalidSpec(format!("empty package name in '{s}'")));
        }
        Ok(Self {
            name: Some(name.to_string()),
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }
}

/// Ordered, index-aligned package names and target versions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PackageSpec {
    entries: Vec<PackageEntry>,
}

impl PackageSpec {
    /// Pair up names and versions by index.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSpec`] if the lists differ in length.
    pub fn new(names: Vec<Option<String>>, versions: Vec<Option<String>>) -> Result<Self> {
        if names.len() != versions.len() {
            return Err(Error::InvalidSpec(format!(
                "{} names but {} versions",
                names.len(),
                versions.len()
            )));
        }
        let entries = names
            .into_iter()
            .zip(versions)
            .map(|(name, version)| PackageEntry { name, version })
            .collect();
        Ok(Self { entries })
    }

    /// Spec with every name present and no version constraints.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(PackageEntry::named).collect(),
        }
    }

    #[must_use]
    pub fn from_entries(entries: Vec<PackageEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&PackageEntry> {
        self.entries.get(index)
    }

    pub(crate) fn checked_entry(&self, index: usize) -> Result<&PackageEntry> {
        self.entries.get(index).ok_or_else(|| {
            Error::InvalidSpec(format!(
                "index {index} out of range for {} packages",
                self.entries.len()
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageEntry> {
        self.entries.iter()
    }

    /// Indices whose name is present, in order.
    pub fn named_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name.is_some())
            .map(|(i, _)| i)
    }
}

/// What an intent requires for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Install,
    Upgrade,
    Remove,
    Unchanged,
}

/// Resolved view of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageState {
    pub index: usize,
    pub name: Option<String>,
    pub requested: Option<String>,
    pub installed: Option<String>,
    pub available: Option<String>,
}

impl PackageState {
    /// Transition needed to reach the state `intent` asks for.
    ///
    /// Versions compare as plain strings. Entries without a name never
    /// change.
    #[must_use]
    pub fn transition(&self, intent: Intent) -> Transition {
        if self.name.is_none() {
            return Transition::Unchanged;
        }
        match (intent, self.installed.as_deref()) {
            (Intent::Remove | Intent::Purge, Some(_)) => Transition::Remove,
            (Intent::Remove | Intent::Purge, None) => Transition::Unchanged,
            (Intent::Install | Intent::Upgrade, None) => Transition::Install,
            (Intent::Install, Some(installed)) => match self.requested.as_deref() {
                Some(requested) if requested != installed => Transition::Upgrade,
                _ => Transition::Unchanged,
            },
            (Intent::Upgrade, Some(installed)) => {
                match self.requested.as_deref().or(self.available.as_deref()) {
                    Some(target) if target != installed => Transition::Upgrade,
                    _ => Transition::Unchanged,
                }
            }
        }
    }
}
