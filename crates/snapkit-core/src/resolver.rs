//! Per-package available and installed versions, memoized by index.

use crate::client::SnapdClient;
use crate::error::Result;
use crate::local::{info_version, LocalCli};
use crate::operation::Intent;
use crate::package::{PackageSpec, PackageState};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Resolves versions for one invocation.
///
/// Answers are cached for the resolver's lifetime, so asking twice for the
/// same index issues one query. Create a new resolver to start fresh.
pub struct VersionResolver<'a> {
    client: SnapdClient<'a>,
    cli: &'a dyn LocalCli,
    spec: &'a PackageSpec,
    channel: &'a str,
    source: Option<&'a Path>,
    available: HashMap<usize, Option<String>>,
    installed: HashMap<usize, Option<String>>,
    source_version: Option<String>,
}

impl<'a> VersionResolver<'a> {
    #[must_use]
    pub fn new(
        client: SnapdClient<'a>,
        cli: &'a dyn LocalCli,
        spec: &'a PackageSpec,
        channel: &'a str,
        source: Option<&'a Path>,
    ) -> Self {
        Self {
            client,
            cli,
            spec,
            channel,
            source,
            available: HashMap::new(),
            installed: HashMap::new(),
            source_version: None,
        }
    }

    #[must_use]
    pub fn spec(&self) -> &'a PackageSpec {
        self.spec
    }

    /// Version offered for package `index`.
    ///
    /// With a local source every index shares the version reported by
    /// `info <source>`. Otherwise the daemon's catalog is asked for the
    /// release on this resolver's channel; a missing release is `None`.
    pub fn available_version(&mut self, index: usize) -> Result<Option<String>> {
        if let Some(version) = self.available.get(&index) {
            return Ok(version.clone());
        }
        let spec = self.spec;
        let entry = spec.checked_entry(index)?;

        let version = if let Some(source) = self.source {
            Some(self.source_version(source)?)
        } else if let Some(name) = entry.name.as_deref() {
            let found = self.client.find(name)?;
            found
                .first()
                .and_then(|snap| snap.release(self.channel))
                .map(|release| release.version.clone())
        } else {
            None
        };

        debug!(index, name = ?entry.name, channel = self.channel, available = ?version, "resolved available version");
        self.available.insert(index, version.clone());
        Ok(version)
    }

    /// Version currently installed for package `index`, `None` if not installed.
    pub fn installed_version(&mut self, index: usize) -> Result<Option<String>> {
        if let Some(version) = self.installed.get(&index) {
            return Ok(version.clone());
        }
        let spec = self.spec;
        let entry = spec.checked_entry(index)?;

        let version = match entry.name.as_deref() {
            Some(name) => self.client.snap(name)?.map(|snap| snap.version),
            None => None,
        };

        debug!(index, name = ?entry.name, installed = ?version, "resolved installed version");
        self.installed.insert(index, version.clone());
        Ok(version)
    }

    /// Installed and, unless removing, available versions for `index`.
    pub fn state(&mut self, index: usize, intent: Intent) -> Result<PackageState> {
        let entry = self.spec.checked_entry(index)?;
        let (name, requested) = (entry.name.clone(), entry.version.clone());

        let installed = self.installed_version(index)?;
        let available = if intent.resolves_installed() {
            None
        } else {
            self.available_version(index)?
        };

        Ok(PackageState {
            index,
            name,
            requested,
            installed,
            available,
        })
    }

    fn source_version(&mut self, source: &Path) -> Result<String> {
        if let Some(version) = &self.source_version {
            return Ok(version.clone());
        }
        let version = info_version(self.cli, source)?;
        self.source_version = Some(version.clone());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{codes, Error};
    use crate::testing::{ScriptedCli, ScriptedTransport};
    use serde_json::json;

    fn find_reply(version: &str) -> serde_json::Value {
        json!({
            "type": "sync",
            "status-code": 200,
            "result": [{"name": "hello", "version": version, "channels": {
                "latest/stable": {"version": version, "revision": "38"},
                "latest/edge": {"version": "2.11-dev"}
            }}]
        })
    }

    #[test]
    fn test_available_version_is_memoized() {
        let transport = ScriptedTransport::new().reply(find_reply("2.10"));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["hello"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);

        assert_eq!(resolver.available_version(0).unwrap().as_deref(), Some("2.10"));
        assert_eq!(resolver.available_version(0).unwrap().as_deref(), Some("2.10"));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.paths(), vec!["/v2/find?name=hello"]);
    }

    #[test]
    fn test_available_version_uses_channel() {
        let transport = ScriptedTransport::new().reply(find_reply("2.10"));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["hello"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "edge", None);
        assert_eq!(resolver.available_version(0).unwrap().as_deref(), Some("2.11-dev"));
    }

    #[test]
    fn test_missing_channel_is_absent() {
        let transport = ScriptedTransport::new().reply(find_reply("2.10"));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["hello"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "beta", None);
        assert!(resolver.available_version(0).unwrap().is_none());
    }

    #[test]
    fn test_find_404_is_package_not_found() {
        let transport = ScriptedTransport::new().reply(json!({"status-code": 404}));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["foo"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);

        let err = resolver.available_version(0).unwrap_err();
        assert_eq!(err.code(), codes::PACKAGE_NOT_FOUND);
        assert!(matches!(err, Error::PackageNotFound { ref name, .. } if name == "foo"));
    }

    #[test]
    fn test_installed_404_is_absent() {
        let transport = ScriptedTransport::new().reply(json!({"status-code": 404}));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["bar"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);

        assert!(resolver.installed_version(0).unwrap().is_none());
        assert!(resolver.installed_version(0).unwrap().is_none());
        assert_eq!(transport.paths(), vec!["/v2/snaps/bar"]);
    }

    #[test]
    fn test_installed_version_reported() {
        let transport = ScriptedTransport::new()
            .reply(json!({"type":"sync","status-code":200,"result":{"name":"bar","version":"1.4"}}));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["bar"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);
        assert_eq!(resolver.installed_version(0).unwrap().as_deref(), Some("1.4"));
    }

    #[test]
    fn test_local_source_info_runs_once_for_all_indices() {
        let transport = ScriptedTransport::new();
        let cli = ScriptedCli::new().output(0, "name: x\nversion: 1.2.3\n", "");
        let spec = PackageSpec::from_names(["x", "y"]);
        let source = Path::new("/srv/x_1.2.3_amd64.snap");
        let mut resolver =
            VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", Some(source));

        assert_eq!(resolver.available_version(0).unwrap().as_deref(), Some("1.2.3"));
        assert_eq!(resolver.available_version(1).unwrap().as_deref(), Some("1.2.3"));
        assert_eq!(cli.invocations().len(), 1);
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_unnamed_index_issues_no_query() {
        let transport = ScriptedTransport::new();
        let cli = ScriptedCli::new();
        let spec = PackageSpec::new(vec![None], vec![None]).unwrap();
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);

        assert!(resolver.available_version(0).unwrap().is_none());
        assert!(resolver.installed_version(0).unwrap().is_none());
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let transport = ScriptedTransport::new();
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["a"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);
        assert_eq!(resolver.available_version(3).unwrap_err().code(), codes::INVALID_SPEC);
    }

    #[test]
    fn test_state_for_remove_skips_catalog() {
        let transport = ScriptedTransport::new()
            .reply(json!({"type":"sync","status-code":200,"result":{"name":"hello","version":"2.10"}}));
        let cli = ScriptedCli::new();
        let spec = PackageSpec::from_names(["hello"]);
        let mut resolver = VersionResolver::new(SnapdClient::new(&transport), &cli, &spec, "stable", None);

        let state = resolver.state(0, Intent::Remove).unwrap();
        assert_eq!(state.installed.as_deref(), Some("2.10"));
        assert!(state.available.is_none());
        assert_eq!(transport.calls().len(), 1);
    }
}
