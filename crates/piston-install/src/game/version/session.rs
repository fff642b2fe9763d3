//! Resolution session: manifest cache plus the selector -> descriptor pipeline.

use crate::error::{InstallError, Result};
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::artifact::Artifact;
use crate::game::installer::core::downloader::{download_artifact, fetch_bytes};
use crate::game::installer::core::store::{ensure_parent, is_plain_name};
use crate::game::installer::types::InstallLayout;
use crate::game::launcher::rules::Environment;
use crate::game::version::descriptor::{decode_descriptor, VersionDescriptor};
use crate::game::version::manifest::{
    JavaRuntimeEntry, ManifestEntry, VersionManifest, VersionSelector,
};
use crate::game::version::patch::fetch_patch;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// A version ready for installation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVersion {
    pub descriptor: VersionDescriptor,
    /// Runtime archive matching the descriptor's Java major version
    pub runtime: Option<JavaRuntimeEntry>,
    pub patched: bool,
}

/// Owns the HTTP client and the per-source manifest cache for one run.
pub struct ResolutionSession {
    client: Client,
    config: InstallerConfig,
    environment: Environment,
    layout: InstallLayout,
    manifests: HashMap<String, Arc<VersionManifest>>,
}

impl ResolutionSession {
    pub fn new(config: InstallerConfig, layout: InstallLayout) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self::with_client(client, config, layout, Environment::current()))
    }

    pub fn with_client(
        client: Client,
        config: InstallerConfig,
        layout: InstallLayout,
        environment: Environment,
    ) -> Self {
        Self {
            client,
            config,
            environment,
            layout,
            manifests: HashMap::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Load a manifest, at most once per source for the life of the session
    pub async fn manifest(&mut self, source: &str) -> Result<Arc<VersionManifest>> {
        if let Some(cached) = self.manifests.get(source) {
            return Ok(cached.clone());
        }
        log::info!("Fetching version manifest from {}", source);
        let bytes = fetch_bytes(&self.client, source).await?;
        let text = String::from_utf8_lossy(&bytes);
        let manifest = Arc::new(VersionManifest::parse(&text)?);
        log::debug!("Manifest lists {} versions", manifest.versions.len());
        self.manifests.insert(source.to_string(), manifest.clone());
        Ok(manifest)
    }

    /// Every entry of the configured manifest, newest first as published
    pub async fn available_versions(&mut self) -> Result<Vec<ManifestEntry>> {
        let source = self.config.manifest_url.clone();
        Ok(self.manifest(&source).await?.versions.clone())
    }

    /// Resolve with patching as configured
    pub async fn resolve(&mut self, selector: &VersionSelector) -> Result<ResolvedVersion> {
        let patching = self.config.patching;
        self.resolve_with(selector, patching).await
    }

    pub async fn resolve_with(
        &mut self,
        selector: &VersionSelector,
        patching: bool,
    ) -> Result<ResolvedVersion> {
        let source = self.config.manifest_url.clone();
        let manifest = self.manifest(&source).await?;
        let entry = manifest.select(selector)?;
        log::info!("Resolving {} -> {} ({})", selector, entry.id, entry.version_type);

        let descriptor = self.load_descriptor(entry).await?;

        let mut patched = false;
        let descriptor = if patching {
            match fetch_patch(&self.client, &self.config.patch_base_url, &entry.id).await? {
                Some(patch) if patch.id != descriptor.id => {
                    return Err(InstallError::State(format!(
                        "patch targets {} but resolved version is {}",
                        patch.id, descriptor.id
                    )));
                }
                Some(patch) => {
                    patched = true;
                    patch.apply(&descriptor, &self.environment, &self.client).await?
                }
                None => descriptor,
            }
        } else {
            descriptor
        };

        let runtime = descriptor
            .java_version
            .as_ref()
            .and_then(|j| manifest.runtime_for(j.major_version))
            .cloned();

        Ok(ResolvedVersion {
            descriptor,
            runtime,
            patched,
        })
    }

    /// Decode the entry's descriptor, reusing the on-disk snapshot when its
    /// hash matches the manifest.
    async fn load_descriptor(&self, entry: &ManifestEntry) -> Result<VersionDescriptor> {
        if !is_plain_name(&entry.id) {
            return Err(InstallError::State(format!(
                "manifest entry id {:?} cannot be used as a directory name",
                entry.id
            )));
        }
        let path = self.layout.descriptor_path(&entry.id);

        let bytes = match entry.sha1 {
            Some(ref sha1) => {
                let snapshot = Artifact::new(&entry.url, sha1, 0, &path);
                download_artifact(&self.client, &snapshot).await?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| InstallError::filesystem(&path, e))?
            }
            None => {
                let bytes = fetch_bytes(&self.client, &entry.url).await?;
                ensure_parent(&path).await?;
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| InstallError::filesystem(&path, e))?;
                bytes
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let descriptor = decode_descriptor(&text)?;
        if descriptor.id != entry.id {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(InstallError::State(format!(
                "descriptor at {} declares id {}, expected {}",
                entry.url, descriptor.id, entry.id
            )));
        }
        Ok(descriptor)
    }
}
