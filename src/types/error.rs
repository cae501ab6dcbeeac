//! Error types for the knowledge state library.

use thiserror::Error;

/// All errors that can occur in the knowledge state library.
#[derive(Error, Debug)]
pub enum KsError {
    /// Out-of-domain numeric input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A baseline was requested over zero snapshots.
    #[error("Baseline requested over an empty snapshot list")]
    EmptyInput,

    /// A snapshot with this id is already stored.
    #[error("Snapshot {0} already exists")]
    DuplicateSnapshot(String),

    /// No snapshot with this id.
    #[error("Snapshot {0} not found")]
    SnapshotNotFound(String),

    /// Invalid magic bytes in file header.
    #[error("Invalid magic bytes in file header")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// File is empty or truncated.
    #[error("File is empty or truncated")]
    Truncated,

    /// Corrupt data at a given offset.
    #[error("Corrupt data at offset {0}")]
    Corrupt(u64),
}

impl KsError {
    /// Shorthand for building an [`KsError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Convenience result type for knowledge state operations.
pub type KsResult<T> = Result<T, KsError>;
