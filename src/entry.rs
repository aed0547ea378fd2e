use std::fs::{self, Metadata};
use std::path::Path;

use tracing::debug;

use crate::context::ScanOptions;
use crate::error::EntryError;
use crate::model::{ErrorStats, PathEntry};

/// Stats a single path into a [`PathEntry`].
///
/// Symlinks are resolved once so a link to a directory reports
/// `is_directory` while keeping `is_symlink`. A dangling link is reported as
/// a zero-sized non-directory.
pub fn read_entry(path: &Path) -> Result<PathEntry, EntryError> {
    let link_meta = fs::symlink_metadata(path).map_err(|err| EntryError::from_io(path, err))?;
    let is_symlink = link_meta.file_type().is_symlink();

    let meta = if is_symlink {
        match fs::metadata(path) {
            Ok(target) => target,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "dangling symlink");
                link_meta
            }
        }
    } else {
        link_meta
    };

    Ok(entry_from_metadata(path, &meta, is_symlink))
}

fn entry_from_metadata(path: &Path, meta: &Metadata, is_symlink: bool) -> PathEntry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let is_directory = meta.is_dir();

    PathEntry {
        name,
        path: path.to_path_buf(),
        size: if is_directory || meta.file_type().is_symlink() { 0 } else { meta.len() },
        modified: meta.modified().ok(),
        is_directory,
        is_symlink,
    }
}

/// Lists the direct children of `dir`, sorted by name.
///
/// Skip-listed names are pruned silently. Children that vanish or cannot be
/// stat'ed are counted in `errors` and left out. Only a failure to open `dir`
/// itself is returned.
pub fn read_children(
    dir: &Path,
    options: &ScanOptions,
    errors: &ErrorStats,
) -> Result<Vec<PathEntry>, EntryError> {
    let read_dir = fs::read_dir(dir).map_err(|err| EntryError::from_io(dir, err))?;

    let mut children = Vec::new();
    for item in read_dir {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                let err = EntryError::from_io(dir, err);
                errors.record(err.kind());
                debug!(error = %err, "directory iteration failed");
                continue;
            }
        };

        let name = item.file_name().to_string_lossy().into_owned();
        if options.is_skipped(&name) {
            debug!(path = %item.path().display(), "pruned skip-listed entry");
            continue;
        }

        match read_entry(&item.path()) {
            Ok(entry) => children.push(entry),
            Err(err) => {
                errors.record(err.kind());
                debug!(error = %err, "skipping unreadable entry");
            }
        }
    }

    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}
