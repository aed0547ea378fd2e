//! Error types for walks, size scans and comparisons.
//!
//! Per-entry failures never leave the walker; they are counted in
//! [`ErrorStats`](crate::model::ErrorStats) and the entry is skipped. Only a
//! bad root or a cancellation reaches the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::{FolderNode, ScanErrorKind};

/// Failure of a whole walk, size scan or comparison.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Root path missing or not a directory
    #[error("invalid root '{}': {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    /// Caller requested cancellation
    #[error("operation cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ScanError::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Failure to stat or list a single path.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("path not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: '{}'", .0.display())]
    PermissionDenied(PathBuf),

    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EntryError {
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => EntryError::NotFound(path),
            io::ErrorKind::PermissionDenied => EntryError::PermissionDenied(path),
            _ => EntryError::Io { path, source: err },
        }
    }

    pub fn kind(&self) -> ScanErrorKind {
        match self {
            EntryError::NotFound(_) => ScanErrorKind::NotFound,
            EntryError::PermissionDenied(_) => ScanErrorKind::AccessDenied,
            EntryError::Io { .. } => ScanErrorKind::Other,
        }
    }
}

/// Failure of a folder size scan. A cancelled scan keeps the partial tree.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("size scan cancelled after {} folders", partial.folder_count)]
    Cancelled { partial: Box<FolderNode> },
}

impl AggregateError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            AggregateError::Scan(err) => err.is_cancelled(),
            AggregateError::Cancelled { .. } => true,
        }
    }

    /// The partially aggregated tree, when the scan was cancelled.
    pub fn partial(&self) -> Option<&FolderNode> {
        match self {
            AggregateError::Cancelled { partial } => Some(partial.as_ref()),
            AggregateError::Scan(_) => None,
        }
    }

    pub fn into_partial(self) -> Option<FolderNode> {
        match self {
            AggregateError::Cancelled { partial } => Some(*partial),
            AggregateError::Scan(_) => None,
        }
    }
}

/// Returns true when any error in the chain is a cancellation.
pub fn is_scan_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ScanError>()
            .is_some_and(ScanError::is_cancelled)
            || cause
                .downcast_ref::<AggregateError>()
                .is_some_and(AggregateError::is_cancelled)
    })
}
