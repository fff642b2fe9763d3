use crate::error::Result;
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::core::store::sha1_hex;
use reqwest::Client;
use std::path::{Path, PathBuf};

/// One fetchable, hash-verified file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    url: String,
    sha1: String,
    size: u64,
    path: PathBuf,
}

impl Artifact {
    pub fn new(
        url: impl Into<String>,
        sha1: impl AsRef<str>,
        size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            sha1: sha1.as_ref().to_ascii_lowercase(),
            size,
            path: path.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lowercase hex SHA-1 of the expected bytes
    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    /// Advisory size, used for progress weighting
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Same artifact re-rooted under `root` (for descriptor-relative paths)
    pub fn rooted(&self, root: &Path) -> Self {
        Self {
            path: root.join(&self.path),
            ..self.clone()
        }
    }

    pub fn to_patchable(&self) -> PatchableArtifact {
        PatchableArtifact {
            url: self.url.clone(),
            sha1: self.sha1.clone(),
            size: self.size,
            path: self.path.clone(),
        }
    }
}

/// Artifact under rewrite during patch application.
///
/// Changing the URL invalidates hash and size; `relocate` re-derives both
/// from the newly fetched bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchableArtifact {
    pub url: String,
    pub sha1: String,
    pub size: u64,
    pub path: PathBuf,
}

impl PatchableArtifact {
    /// Point at a new location and recompute hash/size from its bytes
    pub async fn relocate(&mut self, url: &str, client: &Client) -> Result<()> {
        let bytes = fetch_bytes(client, url).await?;
        self.sha1 = sha1_hex(&bytes);
        self.size = bytes.len() as u64;
        self.url = url.to_string();
        log::debug!(
            "Relocated artifact to {} (sha1={}, size={})",
            self.url,
            self.sha1,
            self.size
        );
        Ok(())
    }

    /// Replace every `/`-separated path segment equal to `old` with `new`,
    /// and the `-<old>` suffix of the file name.
    pub fn rewrite_version(&mut self, old: &str, new: &str) {
        let text = self.path.to_string_lossy().replace('\\', "/");
        let mut segments: Vec<String> = text.split('/').map(str::to_string).collect();
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter_mut().enumerate() {
            if segment == old {
                *segment = new.to_string();
            } else if i == last {
                *segment = segment.replace(&format!("-{}", old), &format!("-{}", new));
            }
        }
        self.path = PathBuf::from(segments.join("/"));
    }

    pub fn freeze(self) -> Artifact {
        Artifact::new(self.url, self.sha1, self.size, self.path)
    }
}
