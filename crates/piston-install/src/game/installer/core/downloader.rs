use crate::error::{InstallError, Result};
use crate::game::installer::core::artifact::Artifact;
use crate::game::installer::core::store::{commit, ensure_parent, is_satisfied, temp_path_for};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Outcome of bringing one artifact into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was already present with the right hash
    Cached,
    /// The file was downloaded; carries the number of bytes received
    Fetched(u64),
}

/// Make sure `artifact` is in the store, fetching it only when needed
pub async fn download_artifact(client: &Client, artifact: &Artifact) -> Result<FetchOutcome> {
    if is_satisfied(artifact.path(), artifact.sha1()).await? {
        return Ok(FetchOutcome::Cached);
    }
    let received = fetch_to_store(client, artifact).await?;
    Ok(FetchOutcome::Fetched(received))
}

/// Stream an artifact into a temporary file, verify its hash, and commit it.
///
/// Does not look at what is currently on disk.
pub async fn fetch_to_store(client: &Client, artifact: &Artifact) -> Result<u64> {
    let url = artifact.url();
    let path = artifact.path();
    log::debug!("Downloading: {} -> {:?}", url, path);

    ensure_parent(path).await?;

    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallError::network(url, e))?;

    if !response.status().is_success() {
        return Err(InstallError::network(url, format!("HTTP {}", response.status())));
    }

    let tmp_path = temp_path_for(path);
    let (downloaded, chunk_count) = match stream_and_commit(response, artifact, &tmp_path).await {
        Ok(counts) => counts,
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
    };

    let secs = start.elapsed().as_secs_f64();
    let throughput = (downloaded as f64 / 1024.0 / 1024.0) / secs.max(0.001);
    log::info!(
        "Download stats: url={}, size={} bytes, chunks={}, time={:.2}s, throughput={:.2} MB/s",
        url,
        downloaded,
        chunk_count,
        secs,
        throughput
    );

    Ok(downloaded)
}

/// Everything between creating `tmp_path` and renaming it over the target.
/// The caller removes `tmp_path` when this fails.
async fn stream_and_commit(
    response: reqwest::Response,
    artifact: &Artifact,
    tmp_path: &Path,
) -> Result<(u64, u64)> {
    let url = artifact.url();
    let mut file = File::create(tmp_path)
        .await
        .map_err(|e| InstallError::filesystem(tmp_path, e))?;
    let mut downloaded: u64 = 0;
    let mut chunk_count: u64 = 0;
    let mut hasher = Sha1::new();

    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| InstallError::network(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| InstallError::filesystem(tmp_path, e))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        chunk_count += 1;
    }
    file.flush()
        .await
        .map_err(|e| InstallError::filesystem(tmp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| InstallError::filesystem(tmp_path, e))?;
    drop(file);

    let computed = format!("{:x}", hasher.finalize());
    if !computed.eq_ignore_ascii_case(artifact.sha1()) {
        return Err(InstallError::HashMismatch {
            url: url.to_string(),
            expected: artifact.sha1().to_string(),
            found: computed,
        });
    }
    log::debug!("SHA1 validated: {}", computed);

    commit(tmp_path, artifact.path()).await?;
    Ok((downloaded, chunk_count))
}

/// Download a document to memory
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    fetch_optional_bytes(client, url)
        .await?
        .ok_or_else(|| InstallError::network(url, format!("HTTP {}", StatusCode::NOT_FOUND)))
}

/// Download a document to memory; a 404 yields `None`
pub async fn fetch_optional_bytes(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
    log::debug!("Downloading to memory: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallError::network(url, e))?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| InstallError::network(url, e))?;
            Ok(Some(bytes.to_vec()))
        }
        status => Err(InstallError::network(url, format!("HTTP {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::installer::core::store::sha1_hex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_verifies_and_commits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x/y/a.bin");
        let artifact = Artifact::new(
            format!("{}/a.bin", server.uri()),
            sha1_hex(b"payload"),
            7,
            &target,
        );

        let client = Client::new();
        assert_eq!(
            download_artifact(&client, &artifact).await.unwrap(),
            FetchOutcome::Fetched(7)
        );
        assert_eq!(
            download_artifact(&client, &artifact).await.unwrap(),
            FetchOutcome::Cached
        );
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn hash_mismatch_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.bin");
        let artifact = Artifact::new(
            format!("{}/a.bin", server.uri()),
            sha1_hex(b"payload"),
            7,
            &target,
        );

        let err = fetch_to_store(&Client::new(), &artifact).await.unwrap_err();
        assert!(matches!(err, InstallError::HashMismatch { .. }));
        assert!(!target.exists());
        assert!(!temp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn failed_commit_removes_the_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        // A non-empty directory where the file should land cannot be replaced
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.bin");
        std::fs::create_dir_all(target.join("occupied")).unwrap();
        let artifact = Artifact::new(
            format!("{}/a.bin", server.uri()),
            sha1_hex(b"payload"),
            7,
            &target,
        );

        let err = fetch_to_store(&Client::new(), &artifact).await.unwrap_err();
        assert_eq!(err.kind(), "filesystem");
        assert!(!temp_path_for(&target).exists());
        assert!(target.join("occupied").is_dir());
    }

    #[tokio::test]
    async fn optional_fetch_maps_not_found_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::new();
        let missing = fetch_optional_bytes(&client, &format!("{}/missing.json", server.uri()))
            .await
            .unwrap();
        assert!(missing.is_none());

        let err = fetch_optional_bytes(&client, &format!("{}/broken.json", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "network");
    }
}
