//! Error types for art operations.

use std::fmt;
use std::io;

/// All possible art errors.
#[derive(Debug)]
pub enum ArtError {
    /// The current directory is not an art repository.
    NotARepo,
    /// An art repository already exists here.
    AlreadyExists,
    /// A caller-supplied argument is malformed or missing.
    InvalidArgument(String),
    /// A commit, branch, path, or stash entry does not exist.
    NotFound(String),
    /// The operation would clobber or collide with existing state.
    Conflict(String),
    /// The stage is empty — nothing to commit.
    NothingToCommit,
    /// An I/O error occurred.
    Io(io::Error),
    /// JSON serialization/deserialization failed.
    Json(serde_json::Error),
    /// Could not acquire the repository lock within the timeout.
    LockTimeout,
    /// Stored data is internally inconsistent (bad offsets, bad base64).
    Corrupt(String),
}

impl fmt::Display for ArtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtError::NotARepo => write!(f, "not an art repository (missing .art/art.json)"),
            ArtError::AlreadyExists => write!(f, ".art already exists"),
            ArtError::InvalidArgument(msg) => write!(f, "{msg}"),
            ArtError::NotFound(what) => write!(f, "{what} not found"),
            ArtError::Conflict(msg) => write!(f, "{msg}"),
            ArtError::NothingToCommit => write!(f, "nothing to commit (stage is empty)"),
            ArtError::Io(e) => write!(f, "I/O error: {e}"),
            ArtError::Json(e) => write!(f, "JSON error: {e}"),
            ArtError::LockTimeout => write!(f, "could not acquire repository lock within timeout"),
            ArtError::Corrupt(msg) => write!(f, "corrupt repository data: {msg}"),
        }
    }
}

impl std::error::Error for ArtError {}

impl From<io::Error> for ArtError {
    fn from(e: io::Error) -> Self {
        ArtError::Io(e)
    }
}

impl From<serde_json::Error> for ArtError {
    fn from(e: serde_json::Error) -> Self {
        ArtError::Json(e)
    }
}

/// Convenience alias for Results in art.
pub type ArtResult<T> = Result<T, ArtError>;
