//! Resolve, patch and install versioned game bundles from a piston-style
//! version manifest.
//!
//! A [`ResolutionSession`](game::ResolutionSession) turns a selector into a
//! decoded (and optionally patched) version descriptor; an
//! [`Installation`](game::Installation) then brings its artifacts into the
//! local content store, one phase at a time.

pub mod error;
pub mod game;

pub use error::{InstallError, Result};
