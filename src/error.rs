//! Structured error handling for snapshot persistence.
//!
//! Every failure is classified into one of a small number of kinds so that
//! log lines can be correlated by a stable code:
//! - CP001: I/O failure (create, open, read, write, sync, rename)
//! - CP002: Deserialization failure (malformed or schema-incompatible bytes)
//! - CP003: Delete failure (best effort, never fatal)
//! - CP004: Storage directory could not be resolved

use crate::codec::CodecError;
use std::fmt;
use std::path::PathBuf;

/// Result type alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Coarse classification of a [`PersistError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Creating, opening, reading or writing the snapshot failed.
    IoFailure,
    /// The snapshot bytes could not be decoded.
    DeserializationFailure,
    /// Deleting the snapshot failed.
    DeleteFailure,
    /// The storage directory could not be resolved or created.
    DirectoryFailure,
}

impl ErrorKind {
    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::IoFailure => "CP001",
            Self::DeserializationFailure => "CP002",
            Self::DeleteFailure => "CP003",
            Self::DirectoryFailure => "CP004",
        }
    }
}

/// The file operation that was in progress when an I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Create,
    Open,
    Read,
    Write,
    Sync,
    Rename,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Open => "open",
            Self::Read => "read",
            Self::Write => "write",
            Self::Sync => "sync",
            Self::Rename => "rename",
        };
        f.write_str(name)
    }
}

/// Errors produced while persisting or recovering a cache snapshot.
///
/// Only [`CachePersistenceStrategy::init`](crate::CachePersistenceStrategy::init)
/// hands one of these to the caller. Everything else is logged and
/// converted into a safe fallback at the operation boundary.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    /// A file system operation on the snapshot failed.
    #[error("Failed to {op} cache file '{path}': {source}")]
    Io {
        /// Operation that failed
        op: IoOp,
        /// Path of the snapshot or its temporary sibling
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Encoding the cache into the snapshot failed.
    #[error("Failed to serialize cache to '{path}': {source}")]
    Serialize {
        /// Path being written
        path: PathBuf,
        /// Codec error
        #[source]
        source: CodecError,
    },

    /// The snapshot exists but does not decode into a valid cache.
    #[error("Failed to read cache file '{path}': {source}")]
    Deserialize {
        /// Path being read
        path: PathBuf,
        /// Codec error
        #[source]
        source: CodecError,
    },

    /// The snapshot could not be deleted.
    #[error("Failed to delete cache file '{path}': {source}")]
    Delete {
        /// Path that could not be deleted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No storage directory is available.
    #[error("Cache directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl PersistError {
    /// Create an I/O error for the given operation and path.
    pub fn io(op: IoOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            // A failed encode is a failed write as far as the file is concerned
            Self::Io { .. } | Self::Serialize { .. } => ErrorKind::IoFailure,
            Self::Deserialize { .. } => ErrorKind::DeserializationFailure,
            Self::Delete { .. } => ErrorKind::DeleteFailure,
            Self::DirectoryUnavailable(_) => ErrorKind::DirectoryFailure,
        }
    }
}
