use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::context::ScanContext;
use crate::error::{AggregateError, ScanError};
use crate::model::{FolderNode, SizeProgress};
use crate::progress::{ProgressSink, ProgressThrottle, percentage};
use crate::walker::{TreeWalker, WalkEvent};

/// Builds a [`FolderNode`] tree for `root` with sizes and counts rolled up
/// from the leaves.
///
/// Every directory node is finalised only after all of its children
/// (post-order), its children sorted by descending size. On cancellation the
/// error carries the partial tree with every open directory folded into its
/// parent.
pub fn aggregate_sizes<S>(
    root: &Path,
    context: &ScanContext,
    sink: &mut S,
) -> Result<FolderNode, AggregateError>
where
    S: ProgressSink<SizeProgress> + ?Sized,
{
    context.checkpoint()?;
    let walker = TreeWalker::new(root, true, context)?;
    info!(root = %root.display(), "size scan started");

    let mut throttle = ProgressThrottle::new(context.options().progress_interval);
    let snapshots = context.options().partial_snapshots;
    let mut open: Vec<FolderNode> = Vec::new();
    let mut finished: Option<FolderNode> = None;
    let mut folders_scanned = 0u64;
    let mut total_size = 0u64;
    let mut top_level_dirs = 0usize;
    let mut top_level_done = 0usize;

    for event in walker {
        if context.checkpoint().is_err() {
            let partial = fold_open(open).unwrap_or_else(|| empty_root(root));
            info!(
                root = %root.display(),
                folders = folders_scanned,
                "size scan cancelled"
            );
            return Err(AggregateError::Cancelled {
                partial: Box::new(partial),
            });
        }

        match event {
            WalkEvent::Enter {
                entry,
                depth,
                children,
            } => {
                if depth == 0 {
                    top_level_dirs = children.iter().filter(|c| c.is_directory).count();
                } else {
                    folders_scanned += 1;
                }
                let current_path = entry.path.clone();
                open.push(FolderNode::new(entry.name, entry.path, depth, entry.modified));

                throttle.emit(sink, || SizeProgress {
                    folders_scanned,
                    total_size,
                    current_path,
                    percentage: percentage(top_level_done, top_level_dirs, 99),
                    snapshot: snapshots
                        .then(|| fold_open(open.clone()))
                        .flatten()
                        .map(Arc::new),
                });
            }
            WalkEvent::Entry { entry, .. } if !entry.is_directory => {
                if let Some(current) = open.last_mut() {
                    current.size += entry.size;
                    current.file_count += 1;
                }
                total_size += entry.size;
            }
            WalkEvent::Entry {
                depth: 1,
                descend: false,
                ..
            } => top_level_done += 1,
            WalkEvent::Entry { .. } => {}
            WalkEvent::Leave { depth, .. } => {
                let Some(mut node) = open.pop() else {
                    continue;
                };
                node.sort_children();
                match open.last_mut() {
                    Some(parent) => parent.absorb_child(node),
                    None => finished = Some(node),
                }
                if depth == 1 {
                    top_level_done += 1;
                }
            }
        }
    }

    let tree = finished
        .ok_or_else(|| ScanError::invalid_root(root, "walk ended without closing the root"))?;

    throttle.force(
        sink,
        SizeProgress {
            folders_scanned,
            total_size: tree.size,
            current_path: root.to_path_buf(),
            percentage: 100,
            snapshot: snapshots.then(|| Arc::new(tree.clone())),
        },
    );
    info!(
        root = %root.display(),
        size = tree.size,
        files = tree.file_count,
        folders = tree.folder_count,
        "size scan finished"
    );
    Ok(tree)
}

/// Closes every still-open directory into its parent and returns the root.
fn fold_open(mut open: Vec<FolderNode>) -> Option<FolderNode> {
    while open.len() > 1 {
        let mut node = open.pop()?;
        node.sort_children();
        open.last_mut()?.absorb_child(node);
    }
    let mut root = open.pop()?;
    root.sort_children();
    Some(root)
}

fn empty_root(root: &Path) -> FolderNode {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());
    FolderNode::new(name, root.to_path_buf(), 0, None)
}
