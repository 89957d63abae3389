//! Crate-wide error type.

use std::{fmt, io, path::PathBuf};

/// Convenience alias used throughout the crate.
pub type Result<T, E = BuildError> = core::result::Result<T, E>;

/// A file-system I/O error tagged with the path that caused it.
///
/// Kept distinct from [`BuildError::Io`] so that callers that only care about
/// "something went wrong reading/writing a path" can match on it without
/// tearing apart the larger enum.
#[derive(Debug)]
pub struct PathIoError {
    pub io: io::Error,
    pub path: PathBuf,
}

impl PathIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }
}

impl fmt::Display for PathIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.io)
    }
}

impl std::error::Error for PathIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.io)
    }
}

/// Errors surfaced by the orchestrator core.
///
/// Per-project failures (parse errors, missing inputs, compiler diagnostics)
/// are *not* represented here — those become [`crate::status::UpToDateStatus::Unbuildable`]
/// entries so that a build can continue reporting every project's errors in a
/// single run (§7). This enum is reserved for failures that abort the
/// operation the caller asked for.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] PathIoError),

    #[error("{0} not found")]
    FileNotFound(PathBuf),

    #[error("project references form a cycle:\n{0}")]
    Cycle(String),

    #[error("failed to build dependency graph")]
    GraphConstruction,

    #[error("{0}")]
    Other(String),
}

impl BuildError {
    pub fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io(PathIoError::new(err, path))
    }

    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
