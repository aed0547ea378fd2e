//! Depth-first directory traversal.
//!
//! The walker is a lazy iterator of [`WalkEvent`]s: a directory is announced
//! with [`WalkEvent::Enter`] together with its resolved children, each child
//! follows as a [`WalkEvent::Entry`] (a directory child is entered right
//! after its own entry), and [`WalkEvent::Leave`] closes the directory once
//! all of its children are done.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use tracing::{debug, warn};

use crate::context::ScanContext;
use crate::entry::{read_children, read_entry};
use crate::error::ScanError;
use crate::model::PathEntry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkEvent {
    Enter {
        entry: PathEntry,
        depth: usize,
        children: Vec<PathEntry>,
    },
    /// `descend` is set when the walker will enter this directory next.
    Entry {
        entry: PathEntry,
        depth: usize,
        descend: bool,
    },
    Leave {
        path: PathBuf,
        depth: usize,
    },
}

struct Frame {
    path: PathBuf,
    depth: usize,
    children: vec::IntoIter<PathEntry>,
}

pub struct TreeWalker<'a> {
    context: &'a ScanContext,
    root: PathBuf,
    recursive: bool,
    pending: Option<(PathEntry, usize)>,
    stack: Vec<Frame>,
    visited: HashSet<PathBuf>,
}

impl<'a> TreeWalker<'a> {
    /// Prepares a walk of `root`. Fails when the root is missing or is not a
    /// directory.
    pub fn new(root: &Path, recursive: bool, context: &'a ScanContext) -> Result<Self, ScanError> {
        let entry = read_entry(root).map_err(|err| ScanError::invalid_root(root, err.to_string()))?;
        if !entry.is_directory {
            return Err(ScanError::invalid_root(root, "not a directory"));
        }

        let mut visited = HashSet::new();
        if let Ok(canon) = fs::canonicalize(root) {
            visited.insert(canon);
        }

        Ok(Self {
            context,
            root: root.to_path_buf(),
            recursive,
            pending: Some((entry, 0)),
            stack: Vec::new(),
            visited,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&self, dir: &Path) -> Vec<PathEntry> {
        match read_children(dir, self.context.options(), self.context.errors()) {
            Ok(children) => children,
            Err(err) => {
                self.context.record_error(err.kind());
                warn!(error = %err, "unreadable directory, treating as empty");
                Vec::new()
            }
        }
    }

    fn should_descend(&mut self, child: &PathEntry) -> bool {
        if !self.recursive || !child.is_directory {
            return false;
        }
        if child.is_symlink && !self.context.options().follow_symlinks {
            return false;
        }
        match fs::canonicalize(&child.path) {
            Ok(canon) => {
                if self.visited.insert(canon) {
                    true
                } else {
                    debug!(path = %child.path.display(), "directory already visited, not descending");
                    false
                }
            }
            Err(_) => true,
        }
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        if let Some((entry, depth)) = self.pending.take() {
            let children = self.open(&entry.path);
            self.stack.push(Frame {
                path: entry.path.clone(),
                depth,
                children: children.clone().into_iter(),
            });
            return Some(WalkEvent::Enter {
                entry,
                depth,
                children,
            });
        }

        let frame = self.stack.last_mut()?;
        let depth = frame.depth + 1;
        match frame.children.next() {
            Some(child) => {
                let descend = self.should_descend(&child);
                if descend {
                    self.pending = Some((child.clone(), depth));
                }
                Some(WalkEvent::Entry {
                    entry: child,
                    depth,
                    descend,
                })
            }
            None => {
                let frame = self.stack.pop()?;
                Some(WalkEvent::Leave {
                    path: frame.path,
                    depth: frame.depth,
                })
            }
        }
    }
}
