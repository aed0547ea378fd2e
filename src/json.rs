//! JSON result envelopes for the GUI / IPC boundary.
//!
//! Every response has the shape `{ok, cancelled, data, error}`. A cancelled
//! size scan still ships its partial tree in `data`.

use serde::Serialize;

use crate::error::{AggregateError, ScanError};
use crate::model::{
    ComparisonResult, ComparisonSummary, DifferentEntry, FolderNode, PathEntry, SideEntry,
};
use crate::util::unix_seconds;

#[derive(Serialize, Debug)]
pub struct Envelope<T>
where
    T: Serialize,
{
    pub ok: bool,
    pub cancelled: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            cancelled: false,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl ToString, cancelled: bool, data: Option<T>) -> Self {
        Self {
            ok: false,
            cancelled,
            data,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct JsonFolderNode {
    name: String,
    path: String,
    depth: usize,
    size: u64,
    file_count: u64,
    folder_count: u64,
    modified_unix_secs: Option<i64>,
    children: Vec<JsonFolderNode>,
}

impl From<&FolderNode> for JsonFolderNode {
    fn from(node: &FolderNode) -> Self {
        Self {
            name: node.name.clone(),
            path: node.path.to_string_lossy().into_owned(),
            depth: node.depth,
            size: node.size,
            file_count: node.file_count,
            folder_count: node.folder_count,
            modified_unix_secs: unix_seconds(node.modified),
            children: node.children.iter().map(JsonFolderNode::from).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
struct JsonPathEntry {
    name: String,
    path: String,
    size: u64,
    modified_unix_secs: Option<i64>,
    is_directory: bool,
    is_symlink: bool,
}

impl From<&PathEntry> for JsonPathEntry {
    fn from(entry: &PathEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.to_string_lossy().into_owned(),
            size: entry.size,
            modified_unix_secs: unix_seconds(entry.modified),
            is_directory: entry.is_directory,
            is_symlink: entry.is_symlink,
        }
    }
}

#[derive(Serialize, Debug)]
struct JsonSideEntry {
    relative_path: String,
    #[serde(flatten)]
    entry: JsonPathEntry,
}

impl From<&SideEntry> for JsonSideEntry {
    fn from(side: &SideEntry) -> Self {
        Self {
            relative_path: side.relative_path.clone(),
            entry: JsonPathEntry::from(&side.entry),
        }
    }
}

#[derive(Serialize, Debug)]
struct JsonDifferentEntry {
    relative_path: String,
    left_path: String,
    right_path: String,
    left_size: u64,
    right_size: u64,
    left_modified_unix_secs: Option<i64>,
    right_modified_unix_secs: Option<i64>,
    left_is_directory: bool,
    right_is_directory: bool,
    reason: &'static str,
}

impl From<&DifferentEntry> for JsonDifferentEntry {
    fn from(diff: &DifferentEntry) -> Self {
        Self {
            relative_path: diff.relative_path.clone(),
            left_path: diff.left_path.to_string_lossy().into_owned(),
            right_path: diff.right_path.to_string_lossy().into_owned(),
            left_size: diff.left_size,
            right_size: diff.right_size,
            left_modified_unix_secs: unix_seconds(diff.left_modified),
            right_modified_unix_secs: unix_seconds(diff.right_modified),
            left_is_directory: diff.left_is_directory,
            right_is_directory: diff.right_is_directory,
            reason: diff.reason.label(),
        }
    }
}

#[derive(Serialize, Debug)]
struct JsonSummary {
    total_left: usize,
    total_right: usize,
    only_in_left: usize,
    only_in_right: usize,
    different: usize,
    identical: usize,
}

impl From<&ComparisonSummary> for JsonSummary {
    fn from(summary: &ComparisonSummary) -> Self {
        Self {
            total_left: summary.total_left,
            total_right: summary.total_right,
            only_in_left: summary.only_in_left,
            only_in_right: summary.only_in_right,
            different: summary.different,
            identical: summary.identical,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct JsonComparison {
    left_root: String,
    right_root: String,
    recursive: bool,
    identical: Vec<String>,
    different: Vec<JsonDifferentEntry>,
    only_in_left: Vec<JsonSideEntry>,
    only_in_right: Vec<JsonSideEntry>,
    summary: JsonSummary,
}

impl From<&ComparisonResult> for JsonComparison {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            left_root: result.left_root.to_string_lossy().into_owned(),
            right_root: result.right_root.to_string_lossy().into_owned(),
            recursive: result.recursive,
            identical: result
                .identical
                .iter()
                .map(|m| m.relative_path.clone())
                .collect(),
            different: result.different.iter().map(JsonDifferentEntry::from).collect(),
            only_in_left: result.only_in_left.iter().map(JsonSideEntry::from).collect(),
            only_in_right: result.only_in_right.iter().map(JsonSideEntry::from).collect(),
            summary: JsonSummary::from(&result.summary),
        }
    }
}

pub fn size_envelope(result: &Result<FolderNode, AggregateError>) -> Envelope<JsonFolderNode> {
    match result {
        Ok(tree) => Envelope::success(JsonFolderNode::from(tree)),
        Err(err) => Envelope::failure(
            err,
            err.is_cancelled(),
            err.partial().map(JsonFolderNode::from),
        ),
    }
}

pub fn compare_envelope(result: &Result<ComparisonResult, ScanError>) -> Envelope<JsonComparison> {
    match result {
        Ok(comparison) => Envelope::success(JsonComparison::from(comparison)),
        Err(err) => Envelope::failure(err, err.is_cancelled(), None),
    }
}

/// Serializes an envelope, falling back to a hand-built failure document.
pub fn to_json_string<T: Serialize>(envelope: &Envelope<T>, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(envelope)
    } else {
        serde_json::to_string(envelope)
    };
    encoded.unwrap_or_else(|err| {
        format!(
            "{{\"ok\":false,\"cancelled\":false,\"data\":null,\"error\":\"serialization failed: {}\"}}",
            err
        )
    })
}
