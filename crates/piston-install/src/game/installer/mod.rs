pub mod assets;
pub mod config;
pub mod core;
pub mod mirror;
pub mod natives;
pub mod runtime;
pub mod types;

use crate::error::{InstallError, Result};
use crate::game::installer::assets::AssetIndex;
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::downloader::download_artifact;
use crate::game::installer::core::store::is_plain_name;
use crate::game::installer::core::{Artifact, BatchDownloader, BatchSummary};
use crate::game::installer::natives::NativeArchive;
use crate::game::launcher::rules::Environment;
use crate::game::version::descriptor::VersionDescriptor;
use crate::game::version::session::{ResolutionSession, ResolvedVersion};
use reqwest::Client;
use std::path::PathBuf;
use types::{InstallLayout, ProgressReporter};

/// What `install_all` did, phase by phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub client: BatchSummary,
    pub runtime: Option<BatchSummary>,
    pub runtime_home: Option<PathBuf>,
    pub assets: BatchSummary,
    pub libraries: BatchSummary,
    pub natives_staged: usize,
}

/// Install phases for one resolved version.
///
/// Phases may be run individually in any order, except that natives can only
/// be staged once the library phase has completed.
pub struct Installation {
    client: Client,
    batch: BatchDownloader,
    config: InstallerConfig,
    environment: Environment,
    layout: InstallLayout,
    version: ResolvedVersion,
    libraries_ready: bool,
}

impl Installation {
    /// Install `version` using the session's client, settings and layout
    pub fn new(session: &ResolutionSession, version: ResolvedVersion) -> Self {
        let config = session.config().clone();
        let client = session.client().clone();
        Self {
            batch: BatchDownloader::new(client.clone(), config.concurrency()),
            client,
            config,
            environment: session.environment().clone(),
            layout: session.layout().clone(),
            version,
            libraries_ready: false,
        }
    }

    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.version.descriptor
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub async fn download_client(&self, reporter: &dyn ProgressReporter) -> Result<BatchSummary> {
        let descriptor = self.descriptor();
        let jar = descriptor.client_artifact(&self.layout.client_jar_path(&descriptor.id));
        self.batch.download_batch(vec![jar], "client", reporter).await
    }

    /// Download and unpack the Java runtime; `None` when the manifest offers
    /// no runtime for this version.
    pub async fn download_runtime(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<Option<(BatchSummary, PathBuf)>> {
        let entry = match self.version.runtime {
            Some(ref entry) => entry,
            None => {
                log::info!(
                    "No runtime archive available for {}, skipping",
                    self.descriptor().id
                );
                return Ok(None);
            }
        };

        let archive = runtime::runtime_artifact(entry, &self.layout);
        let summary = self
            .batch
            .download_batch(vec![archive.clone()], "runtime", reporter)
            .await?;
        let home =
            runtime::unpack_runtime(&archive, &self.layout.runtime_home(entry.version)).await?;
        Ok(Some((summary, home)))
    }

    pub async fn download_assets(&self, reporter: &dyn ProgressReporter) -> Result<BatchSummary> {
        let index_ref = match self.descriptor().asset_index {
            Some(ref index) => index,
            None => {
                log::info!("{} declares no asset index", self.descriptor().id);
                return self
                    .batch
                    .download_batch(Vec::new(), "assets", reporter)
                    .await;
            }
        };

        if !is_plain_name(&index_ref.id) {
            return Err(InstallError::State(format!(
                "asset index id {:?} cannot be used as a file name",
                index_ref.id
            )));
        }
        let index_path = self.layout.asset_index_path(&index_ref.id);
        let index_artifact =
            Artifact::new(&index_ref.url, &index_ref.sha1, index_ref.size, &index_path);
        download_artifact(&self.client, &index_artifact).await?;
        let text = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| InstallError::filesystem(&index_path, e))?;
        let index = AssetIndex::parse(&text)?;

        let objects = index.artifacts(
            &self.config.asset_base_url,
            &self.layout.asset_objects_dir(),
        );
        log::info!(
            "Asset index {} lists {} objects ({} unique)",
            index_ref.id,
            index.objects.len(),
            objects.len()
        );
        self.batch.download_batch(objects, "assets", reporter).await
    }

    /// Main artifacts and current-platform native classifiers of every
    /// library whose rules pass
    pub fn library_artifacts(&self) -> Vec<Artifact> {
        let libraries_dir = self.layout.libraries_dir();
        let mut artifacts = Vec::new();
        for library in self.descriptor().applicable_libraries(&self.environment) {
            if let Some(main) = library.main_artifact(&libraries_dir) {
                artifacts.push(main);
            }
            if let Some(native) = library.native_artifact(&self.environment, &libraries_dir) {
                artifacts.push(native);
            }
        }
        artifacts
    }

    pub async fn download_libraries(
        &mut self,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchSummary> {
        let summary = self
            .batch
            .download_batch(self.library_artifacts(), "libraries", reporter)
            .await?;
        self.libraries_ready = true;
        Ok(summary)
    }

    pub fn native_archives(&self) -> Vec<NativeArchive> {
        let libraries_dir = self.layout.libraries_dir();
        self.descriptor()
            .applicable_libraries(&self.environment)
            .filter_map(|library| {
                library
                    .native_artifact(&self.environment, &libraries_dir)
                    .map(|artifact| NativeArchive {
                        path: artifact.path().to_path_buf(),
                        exclude: library.extract_excludes().to_vec(),
                    })
            })
            .collect()
    }

    /// Extract native classifiers into `natives/<version>/`
    pub async fn stage_natives(&self) -> Result<usize> {
        if !self.libraries_ready {
            return Err(InstallError::State(
                "natives cannot be staged before libraries are downloaded".to_string(),
            ));
        }
        let natives_dir = self.layout.natives_dir(&self.descriptor().id);
        natives::stage_natives(&self.native_archives(), &natives_dir).await
    }

    /// Run every phase: client jar, runtime, assets, libraries, natives
    pub async fn install_all(&mut self, reporter: &dyn ProgressReporter) -> Result<InstallReport> {
        log::info!("Installing {}", self.descriptor().id);
        let mut report = InstallReport {
            client: self.download_client(reporter).await?,
            ..Default::default()
        };
        if let Some((summary, home)) = self.download_runtime(reporter).await? {
            report.runtime = Some(summary);
            report.runtime_home = Some(home);
        }
        report.assets = self.download_assets(reporter).await?;
        report.libraries = self.download_libraries(reporter).await?;
        report.natives_staged = self.stage_natives().await?;
        log::info!("Installed {}", self.descriptor().id);
        Ok(report)
    }
}
