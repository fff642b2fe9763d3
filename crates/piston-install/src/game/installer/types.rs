use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Progress reporter trait for installer operations
/// Implementations forward updates to whatever UI drives the install
pub trait ProgressReporter: Send + Sync {
    /// Start a new batch with the number of unique artifacts it holds
    fn start_step(&self, label: &str, total_items: usize);

    /// Fraction of the batch completed, in `[0.0, 1.0]`, non-decreasing
    fn set_progress(&self, label: &str, fraction: f64);

    /// Set a short status message
    fn set_message(&self, _message: &str) {}

    /// Mark a batch as finished
    fn done(&self, label: &str, success: bool);
}

/// A progress reporter that does nothing (silent).
/// Useful for background verification or tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _label: &str, _total_items: usize) {}
    fn set_progress(&self, _label: &str, _fraction: f64) {}
    fn done(&self, _label: &str, _success: bool) {}
}

/// Keeps every progress value it receives, in order
#[derive(Default)]
pub struct RecordingProgressReporter {
    events: Mutex<Vec<(String, f64)>>,
}

impl RecordingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fractions reported for one batch label
    pub fn fractions(&self, label: &str) -> Vec<f64> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|(l, _)| l == label)
                    .map(|(_, f)| *f)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn start_step(&self, _label: &str, _total_items: usize) {}

    fn set_progress(&self, label: &str, fraction: f64) {
        if let Ok(mut events) = self.events.lock() {
            events.push((label.to_string(), fraction));
        }
    }

    fn done(&self, _label: &str, _success: bool) {}
}

/// On-disk layout of an installation root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path to the libraries directory
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Get the path to the natives staging directory for a version
    pub fn natives_dir(&self, version_id: &str) -> PathBuf {
        self.root.join("natives").join(version_id)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// Content-addressed object store, `<hh>/<hash>`
    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.asset_indexes_dir().join(format!("{}.json", index_id))
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    /// JSON snapshot of a version descriptor
    pub fn descriptor_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}.json", version_id))
    }

    pub fn client_jar_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}.jar", version_id))
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("runtime")
    }

    pub fn runtime_archives_dir(&self) -> PathBuf {
        self.runtime_dir().join("archives")
    }

    /// Unpacked runtime for a major version
    pub fn runtime_home(&self, major_version: u32) -> PathBuf {
        self.runtime_dir().join(format!("java-{}", major_version))
    }
}
