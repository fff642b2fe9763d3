//! Installer settings.
//! Defaults are static constants; `InstallerConfig` lets callers override them
//! from a JSON file.

use crate::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONCURRENCY: usize = 8;

// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const PATCH_BASE_URL: &str = "https://f001.backblazeb2.com/file/minecraft-jar-command/patch";
pub const ASSET_OBJECTS_URL: &str = "https://resources.download.minecraft.net";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallerConfig {
    pub manifest_url: String,
    pub patch_base_url: String,
    pub asset_base_url: String,
    pub request_timeout_secs: u64,
    pub concurrency: usize,
    /// Apply patch documents during resolution
    pub patching: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            manifest_url: VANILLA_MANIFEST_URL.to_string(),
            patch_base_url: PATCH_BASE_URL.to_string(),
            asset_base_url: ASSET_OBJECTS_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            patching: false,
        }
    }
}

impl InstallerConfig {
    /// Read overrides from a JSON file; absent keys keep their defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| InstallError::filesystem(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            crate::error::DecodeError::single("installer config", "config", e).into()
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shared HTTP client honouring the configured timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(concat!("piston-install/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InstallError::network(&self.manifest_url, e))
    }

    /// Worker count for download fan-out, never zero
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
