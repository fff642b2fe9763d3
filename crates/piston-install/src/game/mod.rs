pub mod installer;
pub mod launcher;
pub mod version;

// Re-export commonly used types
pub use installer::types::{InstallLayout, ProgressReporter, SilentProgressReporter};
pub use installer::{config::InstallerConfig, InstallReport, Installation};
pub use launcher::{Environment, FeatureSet};
pub use version::{ResolutionSession, ResolvedVersion, VersionSelector};
