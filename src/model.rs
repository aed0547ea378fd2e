use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// One filesystem object as seen by a walk.
///
/// A symlink pointing at a directory has both `is_directory` and `is_symlink`
/// set; `size` is always 0 for directories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_directory: bool,
    pub is_symlink: bool,
}

/// A directory with rolled-up statistics for its whole subtree.
///
/// ```rust
/// use std::path::PathBuf;
/// use treecmp::model::FolderNode;
///
/// let node = FolderNode::new("root", PathBuf::from("/tmp/root"), 0, None);
/// assert_eq!(node.size, 0);
/// assert!(node.children.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub path: PathBuf,
    pub depth: usize,
    pub size: u64,
    pub file_count: u64,
    pub folder_count: u64,
    pub modified: Option<SystemTime>,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn new(
        name: impl Into<String>,
        path: PathBuf,
        depth: usize,
        modified: Option<SystemTime>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            depth,
            size: 0,
            file_count: 0,
            folder_count: 0,
            modified,
            children: Vec::new(),
        }
    }

    /// Adds a finished child directory and its totals.
    pub fn absorb_child(&mut self, child: FolderNode) {
        self.size += child.size;
        self.file_count += child.file_count;
        self.folder_count += 1 + child.folder_count;
        self.children.push(child);
    }

    /// Orders children by descending size, ties broken by name.
    pub fn sort_children(&mut self) {
        self.children
            .sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
    }

    /// Bytes held by files directly inside this directory.
    pub fn direct_file_size(&self) -> u64 {
        let in_children: u64 = self.children.iter().map(|child| child.size).sum();
        self.size.saturating_sub(in_children)
    }

    /// The `n` largest folders anywhere below this node, largest first.
    pub fn largest(&self, n: usize) -> Vec<&FolderNode> {
        let mut all = Vec::new();
        let mut stack: Vec<&FolderNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            all.push(node);
            stack.extend(node.children.iter());
        }
        all.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        all.truncate(n);
        all
    }

    /// Looks up a descendant (or this node) by absolute path.
    pub fn find(&self, path: &Path) -> Option<&FolderNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Why two entries present on both sides were classified as different.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DiffReason {
    TypeMismatch,
    SizeMismatch,
    ModifiedMismatch,
    SizeAndModifiedMismatch,
}

impl DiffReason {
    pub fn label(self) -> &'static str {
        match self {
            DiffReason::TypeMismatch => "type-mismatch",
            DiffReason::SizeMismatch => "size-mismatch",
            DiffReason::ModifiedMismatch => "modified-mismatch",
            DiffReason::SizeAndModifiedMismatch => "size-and-modified-mismatch",
        }
    }
}

/// A relative path found on both sides and considered equivalent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedEntry {
    pub relative_path: String,
    pub left: PathEntry,
    pub right: PathEntry,
}

/// A relative path found on both sides whose entries differ.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DifferentEntry {
    pub relative_path: String,
    pub left_path: PathBuf,
    pub right_path: PathBuf,
    pub left_size: u64,
    pub right_size: u64,
    pub left_modified: Option<SystemTime>,
    pub right_modified: Option<SystemTime>,
    pub left_is_directory: bool,
    pub right_is_directory: bool,
    pub reason: DiffReason,
}

impl DifferentEntry {
    pub fn new(relative_path: String, left: &PathEntry, right: &PathEntry, reason: DiffReason) -> Self {
        Self {
            relative_path,
            left_path: left.path.clone(),
            right_path: right.path.clone(),
            left_size: left.size,
            right_size: right.size,
            left_modified: left.modified,
            right_modified: right.modified,
            left_is_directory: left.is_directory,
            right_is_directory: right.is_directory,
            reason,
        }
    }

    fn swapped(self) -> Self {
        Self {
            relative_path: self.relative_path,
            left_path: self.right_path,
            right_path: self.left_path,
            left_size: self.right_size,
            right_size: self.left_size,
            left_modified: self.right_modified,
            right_modified: self.left_modified,
            left_is_directory: self.right_is_directory,
            right_is_directory: self.left_is_directory,
            reason: self.reason,
        }
    }
}

/// A relative path present under one root only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideEntry {
    pub relative_path: String,
    pub entry: PathEntry,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComparisonSummary {
    pub total_left: usize,
    pub total_right: usize,
    pub only_in_left: usize,
    pub only_in_right: usize,
    pub different: usize,
    pub identical: usize,
}

/// Output of one directory comparison. Every bucket is sorted by relative path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    pub left_root: PathBuf,
    pub right_root: PathBuf,
    pub recursive: bool,
    pub identical: Vec<MatchedEntry>,
    pub different: Vec<DifferentEntry>,
    pub only_in_left: Vec<SideEntry>,
    pub only_in_right: Vec<SideEntry>,
    pub summary: ComparisonSummary,
}

impl ComparisonResult {
    pub fn has_differences(&self) -> bool {
        !(self.different.is_empty() && self.only_in_left.is_empty() && self.only_in_right.is_empty())
    }

    /// The same comparison seen with left and right exchanged.
    pub fn swapped(self) -> Self {
        let summary = ComparisonSummary {
            total_left: self.summary.total_right,
            total_right: self.summary.total_left,
            only_in_left: self.summary.only_in_right,
            only_in_right: self.summary.only_in_left,
            different: self.summary.different,
            identical: self.summary.identical,
        };
        Self {
            left_root: self.right_root,
            right_root: self.left_root,
            recursive: self.recursive,
            identical: self
                .identical
                .into_iter()
                .map(|m| MatchedEntry {
                    relative_path: m.relative_path,
                    left: m.right,
                    right: m.left,
                })
                .collect(),
            different: self.different.into_iter().map(DifferentEntry::swapped).collect(),
            only_in_left: self.only_in_right,
            only_in_right: self.only_in_left,
            summary,
        }
    }
}

/// Progress of a folder size scan.
#[derive(Clone, Debug)]
pub struct SizeProgress {
    pub folders_scanned: u64,
    pub total_size: u64,
    pub current_path: PathBuf,
    pub percentage: u8,
    pub snapshot: Option<Arc<FolderNode>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComparePhase {
    Scanning,
    Comparing,
}

/// Progress of a directory comparison.
#[derive(Clone, Debug)]
pub struct CompareProgress {
    pub phase: ComparePhase,
    pub current: usize,
    pub total: usize,
    pub file_name: String,
    pub percentage: u8,
}

/// Categorisation for errors surfaced during scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanErrorKind {
    AccessDenied,
    NotFound,
    Cancelled,
    Other,
}

impl ScanErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ScanErrorKind::AccessDenied => "access denied",
            ScanErrorKind::NotFound => "not found",
            ScanErrorKind::Cancelled => "cancelled",
            ScanErrorKind::Other => "other",
        }
    }
}

/// Thread-safe accumulator for error statistics.
///
/// ```rust
/// use treecmp::model::{ErrorStats, ScanErrorKind};
///
/// let stats = ErrorStats::default();
/// stats.record(ScanErrorKind::Other);
/// assert_eq!(stats.snapshot()[&ScanErrorKind::Other], 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct ErrorStats {
    counts: Arc<Mutex<HashMap<ScanErrorKind, usize>>>,
}

impl ErrorStats {
    /// Increments the counter for the provided error kind.
    pub fn record(&self, kind: ScanErrorKind) {
        let mut guard = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        *guard.entry(kind).or_insert(0) += 1;
    }

    /// Returns a copy of the current error counters.
    pub fn snapshot(&self) -> HashMap<ScanErrorKind, usize> {
        self.counts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn count(&self, kind: ScanErrorKind) -> usize {
        self.snapshot().get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.snapshot().values().sum()
    }
}
