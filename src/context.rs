use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use crate::error::ScanError;
use crate::model::{ErrorStats, ScanErrorKind};

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MTIME_TOLERANCE: Duration = Duration::from_secs(2);

/// OS-reserved directory names pruned from every walk.
pub const DEFAULT_SKIP_NAMES: &[&str] = &[
    "$RECYCLE.BIN",
    "$Recycle.Bin",
    "RECYCLER",
    "System Volume Information",
    ".Trash",
    ".Trashes",
    ".Spotlight-V100",
    ".fseventsd",
    "lost+found",
];

/// Shared cancellation flag. The caller owns it and sets it from any thread;
/// operations poll it at their checkpoints.
///
/// ```rust
/// use treecmp::context::CancelFlag;
///
/// let flag = CancelFlag::new();
/// flag.cancel();
/// assert!(flag.is_cancelled());
/// flag.reset();
/// assert!(!flag.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(AtomicOrdering::Relaxed)
    }

    /// Clears a previous cancellation. Must be called by the initiating
    /// caller before reusing the flag for a new operation.
    pub fn reset(&self) {
        self.inner.store(false, AtomicOrdering::Relaxed);
    }
}

/// Parameters supplied to every walk, size scan and comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    pub skip_names: BTreeSet<String>,
    pub follow_symlinks: bool,
    pub progress_interval: Duration,
    pub mtime_tolerance: Duration,
    pub partial_snapshots: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_names: DEFAULT_SKIP_NAMES.iter().map(|name| name.to_string()).collect(),
            follow_symlinks: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            mtime_tolerance: DEFAULT_MTIME_TOLERANCE,
            partial_snapshots: false,
        }
    }
}

impl ScanOptions {
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_names.contains(name)
    }

    pub fn with_skip_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_names.extend(names.into_iter().map(Into::into));
        self
    }
}

/// State owned by a single invocation: its options, the caller's cancel
/// flag and the error counters.
#[derive(Clone, Debug)]
pub struct ScanContext {
    options: ScanOptions,
    cancel: CancelFlag,
    errors: ErrorStats,
}

impl ScanContext {
    pub fn new(options: ScanOptions, cancel: CancelFlag) -> Self {
        Self::with_errors(options, cancel, ErrorStats::default())
    }

    pub fn with_errors(options: ScanOptions, cancel: CancelFlag, errors: ErrorStats) -> Self {
        Self {
            options,
            cancel,
            errors,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn errors(&self) -> &ErrorStats {
        &self.errors
    }

    pub fn record_error(&self, kind: ScanErrorKind) {
        self.errors.record(kind);
    }

    /// Cancellation checkpoint. Records the cancellation once observed.
    pub fn checkpoint(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            self.errors.record(ScanErrorKind::Cancelled);
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }
}
