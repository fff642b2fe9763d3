use crate::error::{DecodeError, InstallError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level version manifest (`version_manifest_v2.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<ManifestEntry>,
    /// Runtime archives offered alongside the versions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub java_runtimes: Vec<JavaRuntimeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    /// Digest of the descriptor document; absent in v1 manifests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    pub time: DateTime<Utc>,
    pub release_time: DateTime<Utc>,
}

impl ManifestEntry {
    pub fn is_release(&self) -> bool {
        self.version_type == "release"
    }
}

/// One downloadable Java runtime archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaRuntimeEntry {
    /// Major version, e.g. `17`
    pub version: u32,
    pub url: String,
    pub size: u64,
    pub sha1: String,
}

/// Which manifest entry to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    LatestRelease,
    LatestSnapshot,
    Explicit(String),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::LatestRelease => write!(f, "release"),
            VersionSelector::LatestSnapshot => write!(f, "snapshot"),
            VersionSelector::Explicit(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for VersionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "release" | "latest" => VersionSelector::LatestRelease,
            "snapshot" => VersionSelector::LatestSnapshot,
            id => VersionSelector::Explicit(id.to_string()),
        })
    }
}

impl VersionManifest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| DecodeError::single("version manifest", "manifest", e).into())
    }

    /// Entry for the selector, matched by exact id
    pub fn select(&self, selector: &VersionSelector) -> Result<&ManifestEntry> {
        let id = match selector {
            VersionSelector::LatestRelease => self.latest.release.as_str(),
            VersionSelector::LatestSnapshot => self.latest.snapshot.as_str(),
            VersionSelector::Explicit(id) => id.as_str(),
        };
        self.versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| InstallError::UnknownVersion(selector.to_string()))
    }

    /// Runtime archive for a Java major version, if the manifest offers one
    pub fn runtime_for(&self, major_version: u32) -> Option<&JavaRuntimeEntry> {
        self.java_runtimes.iter().find(|r| r.version == major_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "latest": {"release": "1.20.1", "snapshot": "23w31a"},
        "versions": [
            {"id": "23w31a", "type": "snapshot", "url": "http://x/23w31a.json", "sha1": "aa",
             "time": "2023-08-01T00:00:00+00:00", "releaseTime": "2023-08-01T00:00:00+00:00"},
            {"id": "1.20.1", "type": "release", "url": "http://x/1.20.1.json", "sha1": "bb",
             "time": "2023-06-12T13:25:51+00:00", "releaseTime": "2023-06-12T13:25:51+00:00"}
        ],
        "javaRuntimes": [{"version": 17, "url": "http://x/jre17.zip", "size": 5, "sha1": "cc"}]
    }"#;

    #[test]
    fn selects_latest_and_explicit() {
        let m = VersionManifest::parse(MANIFEST).unwrap();
        assert_eq!(m.select(&VersionSelector::LatestRelease).unwrap().id, "1.20.1");
        assert_eq!(m.select(&VersionSelector::LatestSnapshot).unwrap().id, "23w31a");
        let entry = m.select(&"1.20.1".parse().unwrap()).unwrap();
        assert!(entry.is_release());
        assert_eq!(entry.sha1.as_deref(), Some("bb"));
    }

    #[test]
    fn unknown_id_is_an_error() {
        let m = VersionManifest::parse(MANIFEST).unwrap();
        let err = m.select(&VersionSelector::Explicit("1.20".into())).unwrap_err();
        assert!(matches!(err, InstallError::UnknownVersion(ref s) if s == "1.20"));
    }

    #[test]
    fn runtime_lookup() {
        let m = VersionManifest::parse(MANIFEST).unwrap();
        assert_eq!(m.runtime_for(17).unwrap().url, "http://x/jre17.zip");
        assert!(m.runtime_for(8).is_none());
    }

    #[test]
    fn bad_manifest_is_decoding_error() {
        let err = VersionManifest::parse(r#"{"latest": {}}"#).unwrap_err();
        assert_eq!(err.kind(), "decoding");
    }
}
