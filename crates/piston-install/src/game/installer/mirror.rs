//! Mirroring version artifacts into an external object store.
//!
//! Only the contract lives here; storage backends implement [`ObjectStore`].

use crate::error::{InstallError, Result};
use crate::game::installer::core::artifact::Artifact;
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::core::store::sha1_hex;
use crate::game::version::descriptor::{DownloadInfo, Library, VersionDescriptor};
use futures::future::{try_join_all, BoxFuture};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use std::path::Path;

const JAR_CONTENT_TYPE: &str = "application/java-archive";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// An object already present in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub sha1: String,
    pub size: u64,
}

/// Result of an upload, including where the object can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub name: String,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

pub trait ObjectStore: Send + Sync {
    fn list_existing<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<StoredObject>>>;

    fn upload<'a>(
        &'a self,
        name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<UploadedObject>>;

    /// Public download URL of an object by name
    fn public_url(&self, name: &str) -> String;
}

/// Copy one artifact into the store under `target_name`
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub source: Artifact,
    pub target_name: String,
    pub content_type: String,
}

impl MirrorRequest {
    pub fn new(source: Artifact, target_name: impl Into<String>, content_type: &str) -> Self {
        Self {
            source,
            target_name: target_name.into(),
            content_type: content_type.to_string(),
        }
    }

    /// Upload unless an object with the same name, hash and size exists;
    /// returns the source artifact pointed at its mirrored location.
    pub async fn process(
        &self,
        store: &dyn ObjectStore,
        existing: &[StoredObject],
        client: &Client,
    ) -> Result<Artifact> {
        let already_there = existing.iter().any(|o| {
            o.name == self.target_name
                && o.sha1.eq_ignore_ascii_case(self.source.sha1())
                && o.size == self.source.size()
        });

        let url = if already_there {
            log::debug!("Found existing object {} with correct sha1", self.target_name);
            store.public_url(&self.target_name)
        } else {
            let bytes = fetch_bytes(client, self.source.url()).await?;
            let found = sha1_hex(&bytes);
            if !found.eq_ignore_ascii_case(self.source.sha1()) {
                return Err(InstallError::HashMismatch {
                    url: self.source.url().to_string(),
                    expected: self.source.sha1().to_string(),
                    found,
                });
            }
            log::info!("Uploading {} ({} bytes)", self.target_name, bytes.len());
            store
                .upload(&self.target_name, &self.content_type, bytes)
                .await?
                .url
        };

        Ok(Artifact::new(
            url,
            self.source.sha1(),
            self.source.size(),
            self.source.path(),
        ))
    }
}

/// Mirror the client/server downloads and every library artifact and
/// classifier of `descriptor`, returning a descriptor pointing at the store.
pub async fn mirror_descriptor(
    descriptor: &VersionDescriptor,
    store: &dyn ObjectStore,
    client: &Client,
    concurrency: usize,
) -> Result<VersionDescriptor> {
    let existing = store.list_existing("").await?;
    let mut mirrored = descriptor.clone();
    let id = &descriptor.id;

    let downloads = &mut mirrored.downloads;
    let mut slots: Vec<(&mut DownloadInfo, String, &str)> =
        vec![(&mut downloads.client, format!("{}/downloads/client.jar", id), JAR_CONTENT_TYPE)];
    if let Some(ref mut server) = downloads.server {
        slots.push((server, format!("{}/downloads/server.jar", id), JAR_CONTENT_TYPE));
    }
    if let Some(ref mut mappings) = downloads.client_mappings {
        slots.push((mappings, format!("{}/downloads/client.txt", id), TEXT_CONTENT_TYPE));
    }
    if let Some(ref mut mappings) = downloads.server_mappings {
        slots.push((mappings, format!("{}/downloads/server.txt", id), TEXT_CONTENT_TYPE));
    }

    let existing_ref = existing.as_slice();
    try_join_all(slots.into_iter().map(|(info, target, content_type)| async move {
        let request = MirrorRequest::new(
            info.to_artifact(Path::new(&target)),
            target.clone(),
            content_type,
        );
        let artifact = request.process(store, existing_ref, client).await?;
        info.update_from(&artifact);
        Ok::<_, InstallError>(())
    }))
    .await?;

    log::info!("Mirroring {} libraries", descriptor.libraries.len());
    mirrored.libraries = stream::iter(descriptor.libraries.iter())
        .map(|library| mirror_library(library, store, existing_ref, client))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(mirrored)
}

async fn mirror_library(
    library: &Library,
    store: &dyn ObjectStore,
    existing: &[StoredObject],
    client: &Client,
) -> Result<Library> {
    let mut mirrored = library.clone();
    let downloads = match mirrored.downloads.as_mut() {
        Some(d) => d,
        None => return Ok(library.clone()),
    };

    if let Some(artifact) = downloads.artifact.as_mut() {
        if let Some(relative) = artifact.relative_path(&library.name) {
            let source = Artifact::new(&artifact.url, &artifact.sha1, artifact.size, &relative);
            let target = format!("common/libraries/{}", relative);
            let request = MirrorRequest::new(source, target, JAR_CONTENT_TYPE);
            artifact.update_from(&request.process(store, existing, client).await?);
        }
    }

    if let Some(classifiers) = downloads.classifiers.as_mut() {
        for (key, artifact) in classifiers.iter_mut() {
            let coordinates = format!("{}:{}", library.name, key);
            if let Some(relative) = artifact.relative_path(&coordinates) {
                let source = Artifact::new(&artifact.url, &artifact.sha1, artifact.size, &relative);
                let target = format!("common/natives/{}", relative);
                let request = MirrorRequest::new(source, target, JAR_CONTENT_TYPE);
                artifact.update_from(&request.process(store, existing, client).await?);
            }
        }
    }

    Ok(mirrored)
}
