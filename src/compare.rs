//! Two-tree comparison keyed by root-relative path.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::info;

use crate::context::ScanContext;
use crate::error::ScanError;
use crate::model::{
    CompareProgress, ComparePhase, ComparisonResult, ComparisonSummary, DiffReason,
    DifferentEntry, MatchedEntry, PathEntry, SideEntry,
};
use crate::progress::{ProgressSink, ProgressThrottle, percentage};
use crate::util::{relative_key, relative_path};
use crate::walker::{TreeWalker, WalkEvent};

/// Entries of one side keyed by their lossless root-relative path.
type SideMap = BTreeMap<PathBuf, PathEntry>;

/// Compares the trees under `left` and `right`.
///
/// With `recursive == false` only the direct children of each root are
/// compared; subdirectories are matched as single entries.
pub fn compare_directories<S>(
    left: &Path,
    right: &Path,
    recursive: bool,
    context: &ScanContext,
    sink: &mut S,
) -> Result<ComparisonResult, ScanError>
where
    S: ProgressSink<CompareProgress> + ?Sized,
{
    context.checkpoint()?;
    info!(left = %left.display(), right = %right.display(), recursive, "comparison started");

    let mut throttle = ProgressThrottle::new(context.options().progress_interval);
    let mut scanned = 0usize;
    let left_side = collect_side(left, recursive, context, sink, &mut throttle, &mut scanned)?;
    let right_side = collect_side(right, recursive, context, sink, &mut throttle, &mut scanned)?;

    let result = classify_sides(
        (left.to_path_buf(), left_side),
        (right.to_path_buf(), right_side),
        recursive,
        scanned,
        context,
        sink,
        &mut throttle,
    )?;

    info!(
        identical = result.summary.identical,
        different = result.summary.different,
        only_in_left = result.summary.only_in_left,
        only_in_right = result.summary.only_in_right,
        "comparison finished"
    );
    Ok(result)
}

/// Compares `root` against an empty second side: every entry lands in
/// `only_in_left`.
pub fn compare_against_empty<S>(
    root: &Path,
    recursive: bool,
    context: &ScanContext,
    sink: &mut S,
) -> Result<ComparisonResult, ScanError>
where
    S: ProgressSink<CompareProgress> + ?Sized,
{
    context.checkpoint()?;
    let mut throttle = ProgressThrottle::new(context.options().progress_interval);
    let mut scanned = 0usize;
    let side = collect_side(root, recursive, context, sink, &mut throttle, &mut scanned)?;

    classify_sides(
        (root.to_path_buf(), side),
        (PathBuf::new(), SideMap::new()),
        recursive,
        scanned,
        context,
        sink,
        &mut throttle,
    )
}

fn collect_side<S>(
    root: &Path,
    recursive: bool,
    context: &ScanContext,
    sink: &mut S,
    throttle: &mut ProgressThrottle,
    scanned: &mut usize,
) -> Result<SideMap, ScanError>
where
    S: ProgressSink<CompareProgress> + ?Sized,
{
    let mut side = SideMap::new();
    for event in TreeWalker::new(root, recursive, context)? {
        context.checkpoint()?;
        let WalkEvent::Entry { entry, .. } = event else {
            continue;
        };
        let Some(key) = relative_path(root, &entry.path) else {
            continue;
        };

        *scanned += 1;
        let current = *scanned;
        throttle.emit(sink, || CompareProgress {
            phase: ComparePhase::Scanning,
            current,
            total: current,
            file_name: relative_key(&key),
            percentage: 0,
        });
        side.insert(key, entry);
    }
    Ok(side)
}

/// Buckets the union of both sides. Progress counters continue from the
/// `scanned` entries so `current` never goes backwards within a comparison.
fn classify_sides<S>(
    (left_root, mut left): (PathBuf, SideMap),
    (right_root, mut right): (PathBuf, SideMap),
    recursive: bool,
    scanned: usize,
    context: &ScanContext,
    sink: &mut S,
    throttle: &mut ProgressThrottle,
) -> Result<ComparisonResult, ScanError>
where
    S: ProgressSink<CompareProgress> + ?Sized,
{
    let keys: BTreeSet<PathBuf> = left.keys().chain(right.keys()).cloned().collect();
    let pending = keys.len();
    let total = scanned + pending;
    let tolerance = context.options().mtime_tolerance;

    let mut result = ComparisonResult {
        left_root,
        right_root,
        recursive,
        ..ComparisonResult::default()
    };

    for (index, key) in keys.into_iter().enumerate() {
        context.checkpoint()?;
        let done = index + 1;
        let relative = relative_key(&key);
        throttle.emit(sink, || CompareProgress {
            phase: ComparePhase::Comparing,
            current: scanned + done,
            total,
            file_name: relative.clone(),
            percentage: percentage(done, pending, 99),
        });

        match (left.remove(&key), right.remove(&key)) {
            (Some(entry), None) => result.only_in_left.push(SideEntry {
                relative_path: relative,
                entry,
            }),
            (None, Some(entry)) => result.only_in_right.push(SideEntry {
                relative_path: relative,
                entry,
            }),
            (Some(l), Some(r)) => match classify_pair(&l, &r, tolerance) {
                Some(reason) => result
                    .different
                    .push(DifferentEntry::new(relative, &l, &r, reason)),
                None => result.identical.push(MatchedEntry {
                    relative_path: relative,
                    left: l,
                    right: r,
                }),
            },
            (None, None) => {}
        }
    }

    result.summary = summarize(&result);
    throttle.force(
        sink,
        CompareProgress {
            phase: ComparePhase::Comparing,
            current: total,
            total,
            file_name: String::new(),
            percentage: 100,
        },
    );
    Ok(result)
}

/// Classifies two entries sharing a relative path. `None` means identical.
///
/// A directory facing a file is a type mismatch. Two directories are always
/// identical; their contents are compared as separate entries. Two files
/// differ when their sizes differ or their modification times are further
/// apart than `tolerance`.
pub fn classify_pair(left: &PathEntry, right: &PathEntry, tolerance: Duration) -> Option<DiffReason> {
    if left.is_directory != right.is_directory {
        return Some(DiffReason::TypeMismatch);
    }
    if left.is_directory {
        return None;
    }

    let size_differs = left.size != right.size;
    let modified_differs = !modified_matches(left.modified, right.modified, tolerance);
    match (size_differs, modified_differs) {
        (false, false) => None,
        (true, false) => Some(DiffReason::SizeMismatch),
        (false, true) => Some(DiffReason::ModifiedMismatch),
        (true, true) => Some(DiffReason::SizeAndModifiedMismatch),
    }
}

fn modified_matches(left: Option<SystemTime>, right: Option<SystemTime>, tolerance: Duration) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => {
            let gap = match l.duration_since(r) {
                Ok(gap) => gap,
                Err(err) => err.duration(),
            };
            gap <= tolerance
        }
        (None, None) => true,
        _ => false,
    }
}

fn summarize(result: &ComparisonResult) -> ComparisonSummary {
    let identical = result.identical.len();
    let different = result.different.len();
    let only_in_left = result.only_in_left.len();
    let only_in_right = result.only_in_right.len();
    ComparisonSummary {
        total_left: identical + different + only_in_left,
        total_right: identical + different + only_in_right,
        only_in_left,
        only_in_right,
        different,
        identical,
    }
}
