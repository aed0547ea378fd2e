use std::collections::HashMap;

use crate::model::{ComparisonResult, FolderNode, ScanErrorKind};
use crate::util::{fmt_bytes, format_modified};

/// Prints a tabular folder size report to STDOUT.
///
/// ```rust
/// use std::path::PathBuf;
/// use treecmp::model::FolderNode;
/// use treecmp::report::print_size_report;
///
/// let tree = FolderNode::new("root", PathBuf::from("."), 0, None);
/// print_size_report(&tree, 10);
/// ```
pub fn print_size_report(tree: &FolderNode, top: usize) {
    println!("Target: {}", tree.path.display());
    println!("Total size: {}", fmt_bytes(tree.size));
    println!("Files: {}  Folders: {}", tree.file_count, tree.folder_count);
    println!("-");
    println!(
        "{:<45} {:>14} {:>9} {:>9} {:>8}",
        "Name", "Size", "Files", "Folders", "%"
    );
    println!("{:-<45} {:-<14} {:-<9} {:-<9} {:-<8}", "", "", "", "", "");

    for child in tree.children.iter().take(top) {
        println!(
            "{:<45} {:>14} {:>9} {:>9} {:>8.2}",
            child.name,
            fmt_bytes(child.size),
            child.file_count,
            child.folder_count,
            share(child.size, tree.size),
        );
    }

    let loose = tree.direct_file_size();
    if loose > 0 {
        println!(
            "{:<45} {:>14} {:>9} {:>9} {:>8.2}",
            "(files)",
            fmt_bytes(loose),
            "",
            "",
            share(loose, tree.size),
        );
    }
    if tree.children.len() > top {
        println!("... {} more folders", tree.children.len() - top);
    }
}

/// Prints the largest folders anywhere in the tree.
pub fn print_largest(tree: &FolderNode, count: usize) {
    println!("Largest folders:");
    for node in tree.largest(count) {
        println!("{:>14}  {}", fmt_bytes(node.size), node.path.display());
    }
}

/// Prints a comparison summary followed by each non-empty bucket.
pub fn print_comparison(result: &ComparisonResult, only_differences: bool) {
    let summary = &result.summary;
    println!("Left:  {}", result.left_root.display());
    println!("Right: {}", result.right_root.display());
    println!(
        "Mode: {}",
        if result.recursive { "recursive" } else { "current directory only" }
    );
    println!("-");
    println!("  Identical:  {}", summary.identical);
    println!("  Different:  {}", summary.different);
    println!("  Left only:  {}", summary.only_in_left);
    println!("  Right only: {}", summary.only_in_right);
    println!("  Total left {} / right {}", summary.total_left, summary.total_right);

    if !result.different.is_empty() {
        println!();
        println!(
            "{:<40} {:>12} {:>12} {:>21} {:>21} {}",
            "Different", "Left size", "Right size", "Left modified", "Right modified", "Reason"
        );
        for diff in &result.different {
            println!(
                "{:<40} {:>12} {:>12} {:>21} {:>21} {}",
                diff.relative_path,
                side_size(diff.left_is_directory, diff.left_size),
                side_size(diff.right_is_directory, diff.right_size),
                format_modified(diff.left_modified),
                format_modified(diff.right_modified),
                diff.reason.label(),
            );
        }
    }

    for (title, bucket) in [
        ("Only in left", &result.only_in_left),
        ("Only in right", &result.only_in_right),
    ] {
        if bucket.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for side in bucket {
            let marker = if side.entry.is_directory { "/" } else { "" };
            println!("  {}{}", side.relative_path, marker);
        }
    }

    if !only_differences && !result.identical.is_empty() {
        println!();
        println!("Identical:");
        for matched in &result.identical {
            println!("  {}", matched.relative_path);
        }
    }

    if !result.has_differences() {
        println!();
        println!("No differences found.");
    }
}

/// Prints skipped-entry counters, if any.
pub fn print_error_summary(counts: &HashMap<ScanErrorKind, usize>) {
    let mut kinds: Vec<_> = counts
        .iter()
        .filter(|(kind, count)| **kind != ScanErrorKind::Cancelled && **count > 0)
        .collect();
    if kinds.is_empty() {
        return;
    }
    kinds.sort_by_key(|(kind, _)| kind.label());
    eprintln!("Skipped entries:");
    for (kind, count) in kinds {
        eprintln!("  {:<14} {}", kind.label(), count);
    }
}

fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

fn side_size(is_directory: bool, size: u64) -> String {
    if is_directory {
        String::from("<DIR>")
    } else {
        fmt_bytes(size)
    }
}
