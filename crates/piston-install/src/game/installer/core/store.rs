//! Local content store: cache checks and atomic replacement of artifacts.

use crate::error::{InstallError, Result};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash a file on the blocking pool. `None` when the file does not exist.
pub async fn hash_file(path: &Path) -> Result<Option<String>> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        let mut file = match std::fs::File::open(&owned) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(InstallError::filesystem(&owned, e)),
        };
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| InstallError::filesystem(&owned, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Some(format!("{:x}", hasher.finalize())))
    })
    .await
    .map_err(|e| InstallError::State(format!("hashing task failed: {}", e)))?
}

/// Whether `path` already holds bytes hashing to `expected`.
///
/// A present file with the wrong hash is deleted before returning `false`.
pub async fn is_satisfied(path: &Path, expected: &str) -> Result<bool> {
    let computed = match hash_file(path).await? {
        Some(h) => h,
        None => return Ok(false),
    };

    if computed.eq_ignore_ascii_case(expected) {
        log::debug!("File exists and hash matches, skipping: {:?}", path);
        return Ok(true);
    }

    log::info!(
        "File exists but hash mismatches ({} != {}), removing: {:?}",
        computed,
        expected,
        path
    );
    remove_if_present(path).await?;
    Ok(false)
}

/// Replace `path` with the temporary file at `temp`
pub async fn commit(temp: &Path, path: &Path) -> Result<()> {
    remove_if_present(path).await?;
    tokio::fs::rename(temp, path)
        .await
        .map_err(|e| InstallError::filesystem(path, e))
}

pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::filesystem(parent, e))?;
    }
    Ok(())
}

/// Sibling `.part` file a fetch streams into
pub fn temp_path_for(path: &Path) -> PathBuf {
    let tmp_name = format!(
        "{}.part",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
    );
    path.with_file_name(tmp_name)
}

/// Whether `relative` stays below the directory it gets joined onto: no
/// root, drive prefix or `..` segment under either separator.
pub fn is_contained(relative: &str) -> bool {
    !relative.is_empty()
        && relative.split(['/', '\\']).all(|segment| segment != "..")
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A single path segment, usable as a file or directory name in the store
pub fn is_plain_name(name: &str) -> bool {
    name != "." && !name.contains(['/', '\\']) && is_contained(name)
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::filesystem(path, e)),
    }
}
