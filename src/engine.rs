use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use anyhow::{Result, anyhow};

use crate::aggregate::aggregate_sizes;
use crate::compare;
use crate::context::{CancelFlag, ScanContext, ScanOptions};
use crate::error::{AggregateError, ScanError};
use crate::model::{CompareProgress, ComparisonResult, ErrorStats, FolderNode, SizeProgress};
use crate::progress::{NoProgress, ProgressSink, channel_sink};

/// Computes the folder size tree for `root`.
///
/// This is a UI-agnostic entry point intended for the CLI, the JSON bridge
/// and background handles. The caller owns `cancel` and must reset it before
/// reusing it.
pub fn scan_directory_size<S>(
    root: &Path,
    options: ScanOptions,
    cancel: &CancelFlag,
    sink: &mut S,
) -> Result<FolderNode, AggregateError>
where
    S: ProgressSink<SizeProgress> + ?Sized,
{
    let context = ScanContext::new(options, cancel.clone());
    aggregate_sizes(root, &context, sink)
}

/// Classifies every path under `left` and `right`.
pub fn compare_directories<S>(
    left: &Path,
    right: &Path,
    recursive: bool,
    options: ScanOptions,
    cancel: &CancelFlag,
    sink: &mut S,
) -> Result<ComparisonResult, ScanError>
where
    S: ProgressSink<CompareProgress> + ?Sized,
{
    let context = ScanContext::new(options, cancel.clone());
    compare::compare_directories(left, right, recursive, &context, sink)
}

/// A scan running on its own thread.
///
/// Each handle owns its cancel flag and error counters; handles never share
/// state with each other.
pub struct ScanHandle<T, E> {
    cancel: CancelFlag,
    errors: ErrorStats,
    thread: JoinHandle<Result<T, E>>,
}

impl<T, E> ScanHandle<T, E> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Entries skipped so far, by kind.
    pub fn errors(&self) -> &ErrorStats {
        &self.errors
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the scan. The outer error reports a panicked worker.
    pub fn join(self) -> Result<Result<T, E>> {
        self.thread
            .join()
            .map_err(|_| anyhow!("scan thread panicked"))
    }
}

/// Starts a size scan in the background, streaming progress to `progress`.
pub fn spawn_size_scan(
    root: PathBuf,
    options: ScanOptions,
    progress: Option<Sender<SizeProgress>>,
) -> Result<ScanHandle<FolderNode, AggregateError>> {
    let cancel = CancelFlag::new();
    let errors = ErrorStats::default();
    let context = ScanContext::with_errors(options, cancel.clone(), errors.clone());

    let thread = thread::Builder::new()
        .name(String::from("size-scan"))
        .spawn(move || match progress {
            Some(tx) => aggregate_sizes(&root, &context, &mut channel_sink(tx)),
            None => aggregate_sizes(&root, &context, &mut NoProgress),
        })?;

    Ok(ScanHandle {
        cancel,
        errors,
        thread,
    })
}

/// Starts a comparison in the background, streaming progress to `progress`.
pub fn spawn_compare(
    left: PathBuf,
    right: PathBuf,
    recursive: bool,
    options: ScanOptions,
    progress: Option<Sender<CompareProgress>>,
) -> Result<ScanHandle<ComparisonResult, ScanError>> {
    let cancel = CancelFlag::new();
    let errors = ErrorStats::default();
    let context = ScanContext::with_errors(options, cancel.clone(), errors.clone());

    let thread = thread::Builder::new()
        .name(String::from("compare"))
        .spawn(move || match progress {
            Some(tx) => compare::compare_directories(
                &left,
                &right,
                recursive,
                &context,
                &mut channel_sink(tx),
            ),
            None => compare::compare_directories(
                &left,
                &right,
                recursive,
                &context,
                &mut NoProgress,
            ),
        })?;

    Ok(ScanHandle {
        cancel,
        errors,
        thread,
    })
}
