//! Error taxonomy shared by every installer component.

use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T, E = InstallError> = std::result::Result<T, E>;

/// Errors surfaced by resolution, patching and download batches
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodeError),

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Integrity failure after a fetch completed.
    #[error("SHA1 mismatch for {url}: expected {expected}, found {found}")]
    HashMismatch {
        url: String,
        expected: String,
        found: String,
    },

    #[error("{0} is not a known version")]
    UnknownVersion(String),

    #[error("State error: {0}")]
    State(String),
}

impl InstallError {
    pub fn network(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        InstallError::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        InstallError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly name of the failure kind, for display by callers
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::Network { .. } => "network",
            InstallError::Filesystem { .. } => "filesystem",
            InstallError::Decoding(_) => "decoding",
            InstallError::Encoding(_) => "encoding",
            InstallError::HashMismatch { .. } => "hash-mismatch",
            InstallError::UnknownVersion(_) => "unknown-version",
            InstallError::State(_) => "state",
        }
    }

    /// Whether re-invoking the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InstallError::Network { .. } | InstallError::HashMismatch { .. }
        )
    }
}

/// One failed attempt to decode a document as a particular schema shape
#[derive(Debug)]
pub struct DecodeAttempt {
    pub shape: &'static str,
    pub error: serde_json::Error,
}

impl DecodeAttempt {
    /// How far into the input the attempt got before failing
    pub fn progress(&self) -> (usize, usize) {
        (self.error.line(), self.error.column())
    }
}

/// Every shape was tried and none decoded.
///
/// The primary cause is the attempt that progressed furthest into the input;
/// ties go to the earlier (preferred) shape.
#[derive(Debug)]
pub struct DecodeError {
    pub context: String,
    pub attempts: Vec<DecodeAttempt>,
}

impl DecodeError {
    pub fn new(context: impl Into<String>, attempts: Vec<DecodeAttempt>) -> Self {
        Self {
            context: context.into(),
            attempts,
        }
    }

    /// Single-shape failure (documents that only have one schema)
    pub fn single(
        context: impl Into<String>,
        shape: &'static str,
        error: serde_json::Error,
    ) -> Self {
        Self::new(context, vec![DecodeAttempt { shape, error }])
    }

    pub fn primary(&self) -> Option<&DecodeAttempt> {
        let mut best: Option<&DecodeAttempt> = None;
        for attempt in &self.attempts {
            match best {
                Some(current) if attempt.progress() <= current.progress() => {}
                _ => best = Some(attempt),
            }
        }
        best
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(primary) => {
                write!(f, "{} ({}: {})", self.context, primary.shape, primary.error)?;
                let others: Vec<String> = self
                    .attempts
                    .iter()
                    .filter(|a| !std::ptr::eq(*a, primary))
                    .map(|a| format!("{}: {}", a.shape, a.error))
                    .collect();
                if !others.is_empty() {
                    write!(f, "; also tried [{}]", others.join("; "))?;
                }
                Ok(())
            }
            None => write!(f, "{}", self.context),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.primary()
            .map(|a| &a.error as &(dyn std::error::Error + 'static))
    }
}
