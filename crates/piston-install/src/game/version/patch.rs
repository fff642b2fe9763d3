//! Patch documents that substitute artifact locations for a version.

use crate::error::{DecodeError, InstallError, Result};
use crate::game::installer::core::downloader::fetch_optional_bytes;
use crate::game::launcher::rules::{Environment, OsName};
use crate::game::version::descriptor::{Library, VersionDescriptor};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDocument {
    /// Version this patch targets
    pub id: String,

    #[serde(rename = "clientJarURL", default, skip_serializing_if = "Option::is_none")]
    pub client_jar_url: Option<String>,

    /// Keyed by library short name (`lwjgl`, not `org.lwjgl:lwjgl:3.2.1`)
    #[serde(default)]
    pub libraries: BTreeMap<String, LibraryPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryPatch {
    #[serde(rename = "newLibraryVersion")]
    pub new_library_version: String,

    #[serde(rename = "artifactURL")]
    pub artifact_url: String,

    /// Replacement for the library's macOS native classifier
    #[serde(rename = "macOSNativeURL", default, skip_serializing_if = "Option::is_none")]
    pub native_url: Option<String>,
}

/// `<base>/<version>.json`
pub fn patch_url(base: &str, version_id: &str) -> Result<Url> {
    let text = format!("{}/{}.json", base.trim_end_matches('/'), version_id);
    Url::parse(&text).map_err(|e| {
        InstallError::Encoding(format!(
            "Failed to create patch URL for version {}: {}",
            version_id, e
        ))
    })
}

/// Fetch the patch for a version; `None` when the source has none (HTTP 404)
pub async fn fetch_patch(
    client: &Client,
    base: &str,
    version_id: &str,
) -> Result<Option<PatchDocument>> {
    let url = patch_url(base, version_id)?;
    let bytes = match fetch_optional_bytes(client, url.as_str()).await? {
        Some(b) => b,
        None => {
            log::debug!("No patch published for {}", version_id);
            return Ok(None);
        }
    };
    let patch = serde_json::from_slice::<PatchDocument>(&bytes)
        .map_err(|e| InstallError::from(DecodeError::single("patch document", "patch", e)))?;
    log::info!(
        "Found patch for {} ({} library overrides)",
        version_id,
        patch.libraries.len()
    );
    Ok(Some(patch))
}

impl PatchDocument {
    /// Produce the patched descriptor.
    ///
    /// Overridden artifacts are re-fetched from their new location so their
    /// hash and size describe the new bytes. Libraries that do not apply to
    /// `env` are dropped; the rest pass through unchanged.
    pub async fn apply(
        &self,
        descriptor: &VersionDescriptor,
        env: &Environment,
        client: &Client,
    ) -> Result<VersionDescriptor> {
        let mut patched = descriptor.clone();
        patched.time = Utc::now();

        if let Some(ref new_url) = self.client_jar_url {
            let jar_name = format!("{}.jar", descriptor.id);
            let mut client_jar = patched.downloads.client.to_patchable(Path::new(&jar_name));
            client_jar.relocate(new_url, client).await?;
            patched.downloads.client.update_from(&client_jar.freeze());
        }

        patched.libraries = Vec::with_capacity(descriptor.libraries.len());
        for library in &descriptor.libraries {
            if !library.applies_to(env) {
                log::debug!("Dropping {} (rules exclude this platform)", library.name);
                continue;
            }
            let library_patch = library
                .short_name()
                .and_then(|short| self.libraries.get(short));
            match library_patch {
                Some(p) => patched.libraries.push(p.apply_to(library, client).await?),
                None => patched.libraries.push(library.clone()),
            }
        }

        Ok(patched)
    }
}

impl LibraryPatch {
    async fn apply_to(&self, library: &Library, client: &Client) -> Result<Library> {
        let old_version = library.version().ok_or_else(|| {
            InstallError::State(format!("library {} has no version coordinate", library.name))
        })?;
        let mut parts: Vec<&str> = library.name.split(':').collect();
        parts[2] = self.new_library_version.as_str();

        let mut patched = library.clone();
        patched.name = parts.join(":");
        log::info!("Patching {} -> {}", library.name, patched.name);

        let downloads = match patched.downloads.as_mut() {
            Some(d) => d,
            None => {
                log::warn!("{} has no downloads to patch", library.name);
                return Ok(patched);
            }
        };

        match downloads.artifact.as_mut() {
            Some(artifact) => {
                let mut rewrite = artifact.to_patchable(&library.name).ok_or_else(|| {
                    InstallError::State(format!("cannot derive a path for {}", library.name))
                })?;
                rewrite.relocate(&self.artifact_url, client).await?;
                rewrite.rewrite_version(old_version, &self.new_library_version);
                artifact.update_from(&rewrite.freeze());
            }
            None => log::warn!("{} has no main artifact to patch", library.name),
        }

        if let Some(ref native_url) = self.native_url {
            let mac = Environment::new(OsName::MacOs, "x86_64");
            if let Some(key) = library.native_classifier(&mac) {
                let artifact = downloads
                    .classifiers
                    .as_mut()
                    .and_then(|classifiers| classifiers.get_mut(&key));
                if let Some(artifact) = artifact {
                    let coordinates = format!("{}:{}", library.name, key);
                    if let Some(mut rewrite) = artifact.to_patchable(&coordinates) {
                        rewrite.relocate(native_url, client).await?;
                        rewrite.rewrite_version(old_version, &self.new_library_version);
                        artifact.update_from(&rewrite.freeze());
                    }
                }
            }
        }

        Ok(patched)
    }
}
