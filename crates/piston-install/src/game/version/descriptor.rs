//! Version descriptor (`<id>.json`) model and its schema shapes.

use crate::error::{DecodeError, InstallError, Result};
use crate::game::installer::core::artifact::{Artifact, PatchableArtifact};
use crate::game::installer::core::store::is_contained;
use crate::game::launcher::rules::{evaluate_optional, Environment, FeatureSet, Rule};
use crate::game::version::argument::Argument;
use crate::game::version::decode::{decode_first, Shape};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Decoded version metadata, independent of which schema shape it came from
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    pub id: String,
    pub main_class: String,
    pub version_type: String,
    pub release_time: DateTime<Utc>,
    pub time: DateTime<Utc>,
    pub assets: Option<String>,
    pub asset_index: Option<AssetIndexRef>,
    pub downloads: VersionDownloads,
    pub libraries: Vec<Library>,
    pub java_version: Option<JavaVersion>,
    pub minimum_launcher_version: Option<u32>,
    pub arguments: ArgumentTemplates,
}

/// Launch argument templates in either of the two schema generations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentTemplates {
    Structured {
        game: Vec<Argument>,
        jvm: Vec<Argument>,
    },
    /// Pre-1.13 single whitespace-separated game argument string
    Flat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDownloads {
    pub client: DownloadInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<DownloadInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_mappings: Option<DownloadInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_mappings: Option<DownloadInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl DownloadInfo {
    pub fn to_artifact(&self, path: &Path) -> Artifact {
        Artifact::new(&self.url, &self.sha1, self.size, path)
    }

    pub fn to_patchable(&self, path: &Path) -> PatchableArtifact {
        self.to_artifact(path).to_patchable()
    }

    /// Take over the location and digest of a rewritten artifact
    pub fn update_from(&mut self, artifact: &Artifact) {
        self.url = artifact.url().to_string();
        self.sha1 = artifact.sha1().to_string();
        self.size = artifact.size();
    }
}

/// Asset index information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub major_version: u32,
}

/// Library definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Maven coordinates
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,

    /// Maven repository for libraries without explicit downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,

    /// OS name -> classifier, possibly containing `${arch}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<BTreeMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl LibraryArtifact {
    /// Store-relative path, derived from Maven coordinates when absent.
    ///
    /// Paths that would leave the libraries directory yield `None`.
    pub fn relative_path(&self, maven_name: &str) -> Option<String> {
        let path = self.path.clone().or_else(|| maven_path(maven_name))?;
        if is_contained(&path) {
            Some(path)
        } else {
            log::warn!("Ignoring {}: path {:?} escapes the library store", maven_name, path);
            None
        }
    }

    fn to_artifact(&self, maven_name: &str) -> Option<Artifact> {
        let path = self.relative_path(maven_name)?;
        Some(Artifact::new(&self.url, &self.sha1, self.size, path))
    }

    pub fn to_patchable(&self, maven_name: &str) -> Option<PatchableArtifact> {
        self.to_artifact(maven_name).map(|a| a.to_patchable())
    }

    /// Take over the location, digest and path of a rewritten artifact
    pub fn update_from(&mut self, artifact: &Artifact) {
        self.url = artifact.url().to_string();
        self.sha1 = artifact.sha1().to_string();
        self.size = artifact.size();
        self.path = Some(artifact.path().to_string_lossy().replace('\\', "/"));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Library {
    /// Inclusion check for library lists: rules with no features enabled
    pub fn applies_to(&self, env: &Environment) -> bool {
        evaluate_optional(self.rules.as_deref(), env, &FeatureSet::none())
    }

    /// `group:artifact:version[:classifier]` split on `:`
    fn coordinate(&self, index: usize) -> Option<&str> {
        self.name.split(':').nth(index)
    }

    /// Artifact name without group or version, e.g. `lwjgl`
    pub fn short_name(&self) -> Option<&str> {
        self.coordinate(1)
    }

    pub fn version(&self) -> Option<&str> {
        self.coordinate(2)
    }

    /// Native classifier key for the environment, with `${arch}` substituted
    pub fn native_classifier(&self, env: &Environment) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let template = natives.iter().find_map(|(os, classifier)| {
            if env.os.matches(os) {
                Some(classifier)
            } else {
                None
            }
        })?;
        Some(template.replace("${arch}", env.arch_bits()))
    }

    /// Main artifact, re-rooted under the libraries directory.
    /// Libraries without a `downloads` block carry no hash and yield `None`.
    pub fn main_artifact(&self, libraries_dir: &Path) -> Option<Artifact> {
        let artifact = self.downloads.as_ref()?.artifact.as_ref()?;
        artifact
            .to_artifact(&self.name)
            .map(|a| a.rooted(libraries_dir))
    }

    /// Native classifier artifact for the environment, if this library has one
    pub fn native_artifact(&self, env: &Environment, libraries_dir: &Path) -> Option<Artifact> {
        let classifier = self.native_classifier(env)?;
        let classifiers = self.downloads.as_ref()?.classifiers.as_ref()?;
        let artifact = classifiers.get(&classifier)?;
        artifact
            .to_artifact(&format!("{}:{}", self.name, classifier))
            .map(|a| a.rooted(libraries_dir))
    }

    pub fn extract_excludes(&self) -> &[String] {
        self.extract
            .as_ref()
            .map(|e| e.exclude.as_slice())
            .unwrap_or(&[])
    }
}

/// Convert Maven coordinates to a repository-relative path.
/// `group:artifact:version[:classifier][@ext]`
pub fn maven_path(coordinates: &str) -> Option<String> {
    let (coords, ext) = match coordinates.split_once('@') {
        Some((c, e)) => (c, e),
        None => (coordinates, "jar"),
    };
    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];
    let file = match parts.get(3) {
        Some(classifier) => format!("{}-{}-{}.{}", artifact, version, classifier, ext),
        None => format!("{}-{}.{}", artifact, version, ext),
    };
    Some(format!("{}/{}/{}/{}", group, artifact, version, file))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StructuredArguments {
    #[serde(default)]
    game: Vec<Argument>,
    #[serde(default)]
    jvm: Vec<Argument>,
}

/// Schema shape with an `arguments: {game, jvm}` object (1.13+)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredShape {
    arguments: StructuredArguments,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    asset_index: Option<AssetIndexRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assets: Option<String>,
    downloads: VersionDownloads,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    java_version: Option<JavaVersion>,
    #[serde(default)]
    libraries: Vec<Library>,
    main_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_launcher_version: Option<u32>,
    release_time: DateTime<Utc>,
    time: DateTime<Utc>,
    #[serde(rename = "type")]
    version_type: String,
}

/// Schema shape with a flat `minecraftArguments` string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    asset_index: Option<AssetIndexRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assets: Option<String>,
    downloads: VersionDownloads,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    java_version: Option<JavaVersion>,
    #[serde(default)]
    libraries: Vec<Library>,
    main_class: String,
    minecraft_arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_launcher_version: Option<u32>,
    release_time: DateTime<Utc>,
    time: DateTime<Utc>,
    #[serde(rename = "type")]
    version_type: String,
}

impl From<StructuredShape> for VersionDescriptor {
    fn from(s: StructuredShape) -> Self {
        Self {
            id: s.id,
            main_class: s.main_class,
            version_type: s.version_type,
            release_time: s.release_time,
            time: s.time,
            assets: s.assets,
            asset_index: s.asset_index,
            downloads: s.downloads,
            libraries: s.libraries,
            java_version: s.java_version,
            minimum_launcher_version: s.minimum_launcher_version,
            arguments: ArgumentTemplates::Structured {
                game: s.arguments.game,
                jvm: s.arguments.jvm,
            },
        }
    }
}

impl From<FlatShape> for VersionDescriptor {
    fn from(s: FlatShape) -> Self {
        Self {
            id: s.id,
            main_class: s.main_class,
            version_type: s.version_type,
            release_time: s.release_time,
            time: s.time,
            assets: s.assets,
            asset_index: s.asset_index,
            downloads: s.downloads,
            libraries: s.libraries,
            java_version: s.java_version,
            minimum_launcher_version: s.minimum_launcher_version,
            arguments: ArgumentTemplates::Flat(s.minecraft_arguments),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EncodedShape {
    Structured(StructuredShape),
    Flat(FlatShape),
}

impl VersionDescriptor {
    fn to_shape(&self) -> EncodedShape {
        let d = self.clone();
        match d.arguments {
            ArgumentTemplates::Structured { game, jvm } => {
                EncodedShape::Structured(StructuredShape {
                    arguments: StructuredArguments { game, jvm },
                    asset_index: d.asset_index,
                    assets: d.assets,
                    downloads: d.downloads,
                    id: d.id,
                    java_version: d.java_version,
                    libraries: d.libraries,
                    main_class: d.main_class,
                    minimum_launcher_version: d.minimum_launcher_version,
                    release_time: d.release_time,
                    time: d.time,
                    version_type: d.version_type,
                })
            }
            ArgumentTemplates::Flat(minecraft_arguments) => EncodedShape::Flat(FlatShape {
                asset_index: d.asset_index,
                assets: d.assets,
                downloads: d.downloads,
                id: d.id,
                java_version: d.java_version,
                libraries: d.libraries,
                main_class: d.main_class,
                minecraft_arguments,
                minimum_launcher_version: d.minimum_launcher_version,
                release_time: d.release_time,
                time: d.time,
                version_type: d.version_type,
            }),
        }
    }

    /// Encode back into the schema shape this descriptor was decoded from
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_shape())
            .map_err(|e| InstallError::Encoding(format!("version {}: {}", self.id, e)))
    }

    /// Client jar as a store artifact at `path`
    pub fn client_artifact(&self, path: &Path) -> Artifact {
        self.downloads.client.to_artifact(path)
    }

    /// Libraries whose rules pass for `env` with no features enabled
    pub fn applicable_libraries<'a>(
        &'a self,
        env: &'a Environment,
    ) -> impl Iterator<Item = &'a Library> + 'a {
        self.libraries.iter().filter(move |lib| lib.applies_to(env))
    }
}

fn structured(text: &str) -> serde_json::Result<VersionDescriptor> {
    serde_json::from_str::<StructuredShape>(text).map(VersionDescriptor::from)
}

fn flat(text: &str) -> serde_json::Result<VersionDescriptor> {
    serde_json::from_str::<FlatShape>(text).map(VersionDescriptor::from)
}

/// Newest schema first
const DESCRIPTOR_SHAPES: [Shape<VersionDescriptor>; 2] = [
    Shape::new("structured arguments", structured),
    Shape::new("flat argument string", flat),
];

pub fn decode_descriptor(text: &str) -> std::result::Result<VersionDescriptor, DecodeError> {
    decode_first("version descriptor", text, &DESCRIPTOR_SHAPES)
}
