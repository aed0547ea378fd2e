use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use time::OffsetDateTime;
use time::macros::format_description;

const MODIFIED_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]Z");

/// Converts a byte count into a human-readable string using binary units.
///
/// ```rust
/// use treecmp::util::fmt_bytes;
/// assert_eq!(fmt_bytes(1536), "1.50 KiB");
/// assert_eq!(fmt_bytes(12), "12 B");
/// ```
pub fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{:.2} {}", value, UNITS[unit]),
    }
}

/// Path of `path` relative to `root`, normal components only. `None` for
/// the root itself.
///
/// The result keeps the raw `OsStr` components, so names that are not valid
/// UTF-8 stay distinct.
///
/// ```rust
/// use std::path::Path;
/// use treecmp::util::relative_path;
///
/// let rel = relative_path(Path::new("/data/left"), Path::new("/data/left/a/b.txt"));
/// assert_eq!(rel.as_deref(), Some(Path::new("a/b.txt")));
/// assert_eq!(relative_path(Path::new("/data/left"), Path::new("/data/left")), None);
/// ```
pub fn relative_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative: PathBuf = path
        .strip_prefix(root)
        .ok()?
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect();
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative)
}

/// `/`-separated display form of a relative path.
///
/// ```rust
/// use std::path::Path;
/// use treecmp::util::relative_key;
///
/// assert_eq!(relative_key(Path::new("a/b.txt")), "a/b.txt");
/// ```
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Seconds since the unix epoch; negative before it.
pub fn unix_seconds(time: Option<SystemTime>) -> Option<i64> {
    time.map(|t| match t.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(err) => -(err.duration().as_secs() as i64),
    })
}

/// UTC timestamp for reports, `-` when unknown.
pub fn format_modified(timestamp: Option<SystemTime>) -> String {
    timestamp
        .and_then(|ts| OffsetDateTime::from(ts).format(MODIFIED_FORMAT).ok())
        .unwrap_or_else(|| String::from("-"))
}
