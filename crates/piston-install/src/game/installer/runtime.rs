//! Java runtime archives: download target and unpacking.

use crate::error::{InstallError, Result};
use crate::game::installer::core::artifact::Artifact;
use crate::game::installer::types::InstallLayout;
use crate::game::version::manifest::JavaRuntimeEntry;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

/// Records which archive a runtime home was unpacked from
const MARKER_FILE: &str = ".archive-sha1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".zip") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

/// Where the runtime archive for `entry` is stored
pub fn runtime_artifact(entry: &JavaRuntimeEntry, layout: &InstallLayout) -> Artifact {
    let kind = ArchiveKind::from_url(&entry.url);
    let file_name = format!("java-{}.{}", entry.version, kind.extension());
    Artifact::new(
        &entry.url,
        &entry.sha1,
        entry.size,
        layout.runtime_archives_dir().join(file_name),
    )
}

/// Unpack a downloaded runtime archive into `home`, unless `home` already
/// holds this exact archive's contents. Returns `home`.
pub async fn unpack_runtime(archive: &Artifact, home: &Path) -> Result<PathBuf> {
    let marker = home.join(MARKER_FILE);
    if let Ok(recorded) = tokio::fs::read_to_string(&marker).await {
        if recorded.trim().eq_ignore_ascii_case(archive.sha1()) {
            log::debug!("Runtime already unpacked at {:?}", home);
            return Ok(home.to_path_buf());
        }
    }

    match tokio::fs::remove_dir_all(home).await {
        Ok(()) => log::info!("Replacing stale runtime at {:?}", home),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(InstallError::filesystem(home, e)),
    }
    tokio::fs::create_dir_all(home)
        .await
        .map_err(|e| InstallError::filesystem(home, e))?;

    log::info!("Extracting runtime to: {:?}", home);
    let kind = ArchiveKind::from_url(archive.url());
    let archive_path = archive.path().to_path_buf();
    let dest = home.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(kind, &archive_path, &dest))
        .await
        .map_err(|e| InstallError::State(format!("runtime extraction task failed: {}", e)))??;

    tokio::fs::write(&marker, archive.sha1())
        .await
        .map_err(|e| InstallError::filesystem(&marker, e))?;
    Ok(home.to_path_buf())
}

fn extract_blocking(kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive).map_err(|e| InstallError::filesystem(archive, e))?;
    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file).map_err(|e| {
                InstallError::filesystem(archive, IoError::new(ErrorKind::InvalidData, e))
            })?;
            zip.extract(dest).map_err(|e| {
                InstallError::filesystem(dest, IoError::new(ErrorKind::InvalidData, e))
            })
        }
        ArchiveKind::TarGz => {
            let decoder = flate2::read::GzDecoder::new(file);
            let mut tar = tar::Archive::new(decoder);
            tar.unpack(dest).map_err(|e| InstallError::filesystem(dest, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    #[test]
    fn archive_kind_from_url() {
        assert_eq!(ArchiveKind::from_url("http://x/jre.zip"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_url("http://x/jre.zip?sig=1"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_url("http://x/jre.tar.gz"), ArchiveKind::TarGz);
    }

    #[test]
    fn artifact_lands_in_archives_dir() {
        let layout = InstallLayout::new("/data");
        let entry = JavaRuntimeEntry {
            version: 17,
            url: "http://x/zulu17.tar.gz".into(),
            size: 3,
            sha1: "AB".into(),
        };
        let artifact = runtime_artifact(&entry, &layout);
        assert_eq!(artifact.path(), Path::new("/data/runtime/archives/java-17.tar.gz"));
        assert_eq!(artifact.sha1(), "ab");
    }

    #[tokio::test]
    async fn unpacks_tar_gz_once() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("java-8.tar.gz");
        {
            let file = std::fs::File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let data = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "bin/java", &data[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let archive = Artifact::new("http://x/java-8.tar.gz", "aa", 0, &archive_path);
        let home = tmp.path().join("java-8");
        unpack_runtime(&archive, &home).await.unwrap();
        assert!(home.join("bin/java").exists());

        // Second call sees the marker and leaves the tree alone
        std::fs::write(home.join("bin/extra"), b"kept").unwrap();
        unpack_runtime(&archive, &home).await.unwrap();
        assert!(home.join("bin/extra").exists());
    }

    #[tokio::test]
    async fn unpacks_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("java-17.zip");
        {
            let f = std::fs::File::create(&archive_path).unwrap();
            let mut zip = zip::ZipWriter::new(f);
            zip.start_file::<&str, ()>("bin/java.exe", FileOptions::default())
                .unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.finish().unwrap();
        }

        let archive = Artifact::new("http://x/java-17.zip", "bb", 0, &archive_path);
        let home = tmp.path().join("java-17");
        unpack_runtime(&archive, &home).await.unwrap();
        assert_eq!(std::fs::read(home.join("bin/java.exe")).unwrap(), b"MZ");
    }
}
