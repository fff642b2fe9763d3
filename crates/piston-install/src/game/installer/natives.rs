//! Native library extraction into a version's staging directory
use crate::error::{InstallError, Result};
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

/// A native classifier archive plus the entry prefixes to leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArchive {
    pub path: PathBuf,
    pub exclude: Vec<String>,
}

/// Extract every archive into `natives_dir`; returns the number of files written
pub async fn stage_natives(archives: &[NativeArchive], natives_dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| InstallError::filesystem(natives_dir, e))?;

    let mut written = 0;
    for archive in archives {
        written += extract_archive(&archive.path, natives_dir, &archive.exclude).await?;
    }
    log::info!(
        "Staged {} native files from {} archives into {:?}",
        written,
        archives.len(),
        natives_dir
    );
    Ok(written)
}

/// Extract one zip archive on the blocking pool
pub async fn extract_archive(
    archive: &Path,
    output_dir: &Path,
    exclude: &[String],
) -> Result<usize> {
    let archive = archive.to_path_buf();
    let output_dir = output_dir.to_path_buf();
    let exclude = exclude.to_vec();
    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive, &output_dir, &exclude))
        .await
        .map_err(|e| InstallError::State(format!("native extraction task failed: {}", e)))?
}

fn extract_archive_blocking(
    archive_path: &Path,
    output_dir: &Path,
    exclude: &[String],
) -> Result<usize> {
    log::debug!("Extracting natives from: {:?}", archive_path);

    let file = std::fs::File::open(archive_path)
        .map_err(|e| InstallError::filesystem(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        InstallError::filesystem(archive_path, IoError::new(ErrorKind::InvalidData, e))
    })?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| {
                InstallError::filesystem(archive_path, IoError::new(ErrorKind::InvalidData, e))
            })?;

        if entry.is_dir() || should_exclude(entry.name(), exclude) {
            continue;
        }

        let relative = match entry.enclosed_name() {
            Some(p) => p,
            None => {
                log::warn!("Skipping unsafe entry {:?} in {:?}", entry.name(), archive_path);
                continue;
            }
        };
        let output_path = output_dir.join(relative);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
        }
        let mut output_file = std::fs::File::create(&output_path)
            .map_err(|e| InstallError::filesystem(&output_path, e))?;
        std::io::copy(&mut entry, &mut output_file)
            .map_err(|e| InstallError::filesystem(&output_path, e))?;
        written += 1;
    }

    Ok(written)
}

/// Check if a file should be excluded
fn should_exclude(file_path: &str, exclusions: &[String]) -> bool {
    exclusions.iter().any(|prefix| file_path.starts_with(prefix.as_str()))
}
