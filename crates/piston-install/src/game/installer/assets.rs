//! Asset index and the content-addressed object store it maps into.

use crate::error::{DecodeError, Result};
use crate::game::installer::core::artifact::Artifact;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    #[serde(deserialize_with = "object_hash")]
    pub hash: String,
    pub size: u64,
}

/// Object hashes become store paths, so anything but a SHA-1 hex digest is
/// refused at decode time.
fn object_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let hash = String::deserialize(deserializer)?;
    if hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(hash)
    } else {
        Err(D::Error::custom(format!(
            "object hash {:?} is not a 40-character hex SHA-1",
            hash
        )))
    }
}

impl AssetObject {
    /// `<hh>/<hash>`, shared by the remote URL and the local store
    pub fn relative_path(&self) -> String {
        let prefix = self.hash.get(..2).unwrap_or(&self.hash);
        format!("{}/{}", prefix, self.hash)
    }
}

impl AssetIndex {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| DecodeError::single("asset index", "objects", e).into())
    }

    /// One artifact per distinct hash; names sharing a hash share a file
    pub fn artifacts(&self, base_url: &str, objects_dir: &Path) -> Vec<Artifact> {
        let base = base_url.trim_end_matches('/');
        let mut seen = HashSet::new();
        self.objects
            .values()
            .filter(|object| seen.insert(object.hash.to_ascii_lowercase()))
            .map(|object| {
                let relative = object.relative_path();
                Artifact::new(
                    format!("{}/{}", base, relative),
                    &object.hash,
                    object.size,
                    objects_dir.join(relative),
                )
            })
            .collect()
    }

    /// Sum of the sizes of distinct objects
    pub fn total_size(&self, base_url: &str) -> u64 {
        self.artifacts(base_url, Path::new(""))
            .iter()
            .map(Artifact::size)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{"objects": {
        "minecraft/sounds/a.ogg": {"hash": "bdf48ef6b5d0d23bbb02e17d04865216179f510a", "size": 10},
        "minecraft/sounds/a_copy.ogg": {"hash": "bdf48ef6b5d0d23bbb02e17d04865216179f510a", "size": 10},
        "icons/icon_16x16.png": {"hash": "5ff04807c356f1beed0b86ccf659b44b9983e3fa", "size": 20}
    }}"#;

    #[test]
    fn shared_hashes_collapse_into_one_artifact() {
        let index = AssetIndex::parse(INDEX).unwrap();
        let artifacts =
            index.artifacts("https://resources.example/", Path::new("/assets/objects"));
        assert_eq!(artifacts.len(), 2);
        assert_eq!(index.total_size("x"), 30);

        let icon = artifacts
            .iter()
            .find(|a| a.sha1().starts_with("5ff0"))
            .unwrap();
        assert_eq!(
            icon.url(),
            "https://resources.example/5f/5ff04807c356f1beed0b86ccf659b44b9983e3fa"
        );
        assert_eq!(
            icon.path(),
            Path::new("/assets/objects/5f/5ff04807c356f1beed0b86ccf659b44b9983e3fa")
        );
    }

    #[test]
    fn hashes_that_are_not_sha1_digests_are_rejected() {
        for hash in ["../victim.txt", "../../../../../../../../../../../../etc/passwd", "abc"] {
            let text = format!(r#"{{"objects": {{"x": {{"hash": "{}", "size": 1}}}}}}"#, hash);
            let err = AssetIndex::parse(&text).unwrap_err();
            assert_eq!(err.kind(), "decoding", "{}", hash);
        }

        // Right length, wrong alphabet
        let hash = "z".repeat(40);
        let text = format!(r#"{{"objects": {{"x": {{"hash": "{}", "size": 1}}}}}}"#, hash);
        assert!(AssetIndex::parse(&text).is_err());
    }
}
