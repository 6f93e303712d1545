//! Engine error taxonomy.
//!
//! Corruption of individual log lines is *not* an error — it is reported as a
//! [`LineDiagnostic`](crate::memory::types::LineDiagnostic) and the read
//! continues. Everything that prevents a requested mutation surfaces here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the memory engine.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Malformed or missing operation arguments. No partial state is created.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The target id is absent from the latest view.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// The cooperative file lock was not acquired within the configured bound.
    #[error("timed out waiting for lock at {}", path.display())]
    LockTimeout { path: PathBuf },

    /// Filesystem failure (permissions, disk, ...). Fatal, no retry.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record the engine itself produced failed to serialize.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl MemoryError {
    /// Whether this error is a missing-item signal (as opposed to a failure).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
