pub mod artifact;
pub mod batch;
pub mod downloader;
pub mod store;

pub use artifact::{Artifact, PatchableArtifact};
pub use batch::{BatchDownloader, BatchSummary};
