//! Version resolution: manifest, descriptor decoding and patching
pub mod argument;
pub mod decode;
pub mod descriptor;
pub mod manifest;
pub mod patch;
pub mod session;

pub use argument::Argument;
pub use descriptor::{decode_descriptor, ArgumentTemplates, Library, VersionDescriptor};
pub use manifest::{JavaRuntimeEntry, ManifestEntry, VersionManifest, VersionSelector};
pub use patch::{fetch_patch, PatchDocument};
pub use session::{ResolutionSession, ResolvedVersion};
