use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Result, bail};
use tempfile::TempDir;
use treecmp::aggregate::aggregate_sizes;
use treecmp::compare::compare_against_empty;
use treecmp::context::{CancelFlag, ScanContext, ScanOptions};
use treecmp::engine::{compare_directories, scan_directory_size};
use treecmp::error::{AggregateError, ScanError};
use treecmp::model::{
    CompareProgress, ComparePhase, DiffReason, ErrorStats, FolderNode, ScanErrorKind, SizeProgress,
};
use treecmp::progress::NoProgress;

fn stamp(path: &Path, modified: SystemTime) -> Result<()> {
    File::options().write(true).open(path)?.set_modified(modified)?;
    Ok(())
}

fn write_stamped(path: &Path, len: usize, modified: SystemTime) -> Result<()> {
    fs::write(path, vec![b'Z'; len])?;
    stamp(path, modified)
}

fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn unthrottled() -> ScanOptions {
    ScanOptions {
        progress_interval: Duration::ZERO,
        ..ScanOptions::default()
    }
}

fn scan(root: &Path) -> Result<FolderNode> {
    Ok(scan_directory_size(
        root,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?)
}

fn assert_rollup(node: &FolderNode) {
    let child_size: u64 = node.children.iter().map(|c| c.size).sum();
    let child_files: u64 = node.children.iter().map(|c| c.file_count).sum();
    let child_folders: u64 = node.children.iter().map(|c| 1 + c.folder_count).sum();

    assert!(node.size >= child_size, "{} smaller than its children", node.name);
    assert!(node.file_count >= child_files);
    assert_eq!(node.folder_count, child_folders, "folder count of {}", node.name);
    for pair in node.children.windows(2) {
        assert!(pair[0].size >= pair[1].size, "children of {} not sorted", node.name);
    }
    for child in &node.children {
        assert_eq!(child.depth, node.depth + 1);
        assert_rollup(child);
    }
}

#[test]
fn size_scan_rolls_up_files_and_folders() -> Result<()> {
    let root = TempDir::new()?;
    fs::write(root.path().join("a.txt"), vec![b'A'; 100])?;
    fs::create_dir(root.path().join("sub"))?;
    fs::write(root.path().join("sub").join("b.txt"), vec![b'B'; 50])?;

    let tree = scan(root.path())?;

    assert_eq!(tree.size, 150);
    assert_eq!(tree.file_count, 2);
    assert_eq!(tree.folder_count, 1);
    assert_eq!(tree.depth, 0);
    assert_eq!(tree.children.len(), 1);

    let sub = &tree.children[0];
    assert_eq!(sub.name, "sub");
    assert_eq!(sub.size, 50);
    assert_eq!(sub.file_count, 1);
    assert_eq!(sub.folder_count, 0);
    assert_eq!(tree.direct_file_size(), 100);

    Ok(())
}

#[test]
fn size_scan_orders_children_and_counts_nested_folders() -> Result<()> {
    let root = TempDir::new()?;
    for (name, len) in [("small", 5usize), ("large", 40), ("medium", 20)] {
        let dir = root.path().join(name);
        fs::create_dir(&dir)?;
        fs::write(dir.join("data.bin"), vec![b'X'; len])?;
    }
    let deep = root.path().join("medium").join("inner").join("deeper");
    fs::create_dir_all(&deep)?;
    fs::write(deep.join("leaf.bin"), vec![b'Y'; 7])?;
    fs::create_dir(root.path().join("empty"))?;

    let tree = scan(root.path())?;

    let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["large", "medium", "small", "empty"]);
    assert_eq!(tree.size, 72);
    assert_eq!(tree.file_count, 4);
    assert_eq!(tree.folder_count, 6);
    assert_rollup(&tree);

    let medium = tree
        .find(&root.path().join("medium"))
        .ok_or_else(|| anyhow::anyhow!("medium missing from tree"))?;
    assert_eq!(medium.size, 27);
    assert_eq!(medium.folder_count, 2);

    let largest = tree.largest(2);
    assert_eq!(largest[0].name, "large");
    assert_eq!(largest[1].name, "medium");

    Ok(())
}

#[test]
fn skip_listed_directories_are_excluded_from_totals() -> Result<()> {
    let root = TempDir::new()?;
    fs::write(root.path().join("keep.bin"), vec![b'K'; 10])?;
    let trash = root.path().join("$RECYCLE.BIN");
    fs::create_dir(&trash)?;
    fs::write(trash.join("deleted.bin"), vec![b'D'; 1000])?;
    let custom = root.path().join("node_modules");
    fs::create_dir(&custom)?;
    fs::write(custom.join("dep.js"), vec![b'J'; 500])?;

    let options = ScanOptions::default().with_skip_names(["node_modules"]);
    let tree = scan_directory_size(root.path(), options.clone(), &CancelFlag::new(), &mut NoProgress)?;

    assert_eq!(tree.size, 10);
    assert_eq!(tree.file_count, 1);
    assert_eq!(tree.folder_count, 0);
    assert!(tree.children.is_empty());

    let other = TempDir::new()?;
    let result = compare_directories(
        root.path(),
        other.path(),
        true,
        options,
        &CancelFlag::new(),
        &mut NoProgress,
    )?;
    let keys: Vec<_> = result
        .only_in_left
        .iter()
        .map(|side| side.relative_path.as_str())
        .collect();
    assert_eq!(keys, ["keep.bin"]);

    Ok(())
}

#[test]
fn size_scan_rejects_missing_and_file_roots() -> Result<()> {
    let root = TempDir::new()?;
    let file = root.path().join("plain.txt");
    fs::write(&file, b"x")?;

    for target in [root.path().join("missing"), file] {
        match scan(&target) {
            Ok(_) => bail!("expected {} to be rejected", target.display()),
            Err(err) => {
                let err = err.downcast::<AggregateError>()?;
                assert!(matches!(
                    err,
                    AggregateError::Scan(ScanError::InvalidRoot { .. })
                ));
            }
        }
    }

    Ok(())
}

#[test]
fn compare_classifies_identical_then_size_change() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    write_stamped(&left.path().join("x.txt"), 10, base_time())?;
    write_stamped(&right.path().join("x.txt"), 10, base_time())?;

    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;
    assert_eq!(result.identical.len(), 1);
    assert_eq!(result.identical[0].relative_path, "x.txt");
    assert!(!result.has_differences());

    write_stamped(&right.path().join("x.txt"), 20, base_time())?;
    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;
    assert!(result.identical.is_empty());
    assert_eq!(result.different.len(), 1);
    assert_eq!(result.different[0].reason, DiffReason::SizeMismatch);
    assert_eq!(result.different[0].left_size, 10);
    assert_eq!(result.different[0].right_size, 20);

    Ok(())
}

#[test]
fn compare_applies_modified_tolerance() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    write_stamped(&left.path().join("near.txt"), 4, base_time())?;
    write_stamped(
        &right.path().join("near.txt"),
        4,
        base_time() + Duration::from_secs(1),
    )?;
    write_stamped(&left.path().join("far.txt"), 4, base_time())?;
    write_stamped(
        &right.path().join("far.txt"),
        4,
        base_time() + Duration::from_secs(3600),
    )?;

    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;

    assert_eq!(result.identical.len(), 1);
    assert_eq!(result.identical[0].relative_path, "near.txt");
    assert_eq!(result.different.len(), 1);
    assert_eq!(result.different[0].relative_path, "far.txt");
    assert_eq!(result.different[0].reason, DiffReason::ModifiedMismatch);

    Ok(())
}

#[test]
fn compare_reports_one_sided_entries() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    fs::write(left.path().join("only-left.txt"), b"left")?;
    fs::write(right.path().join("only-right.txt"), b"right")?;

    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;

    assert_eq!(result.summary.only_in_left, 1);
    assert_eq!(result.summary.only_in_right, 1);
    assert_eq!(result.only_in_left[0].relative_path, "only-left.txt");
    assert_eq!(result.only_in_right[0].relative_path, "only-right.txt");
    assert_eq!(result.summary.total_left, 1);
    assert_eq!(result.summary.total_right, 1);

    Ok(())
}

#[test]
fn directory_facing_file_is_a_type_mismatch() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    fs::create_dir(left.path().join("d"))?;
    fs::write(left.path().join("d").join("inside.txt"), b"nested")?;
    fs::write(right.path().join("d"), b"file")?;

    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;

    assert_eq!(result.different.len(), 1);
    assert_eq!(result.different[0].relative_path, "d");
    assert_eq!(result.different[0].reason, DiffReason::TypeMismatch);
    assert!(result.different[0].left_is_directory);
    assert!(!result.different[0].right_is_directory);

    let keys: Vec<_> = result
        .only_in_left
        .iter()
        .map(|side| side.relative_path.as_str())
        .collect();
    assert_eq!(keys, ["d/inside.txt"]);

    Ok(())
}

#[test]
fn flat_compare_matches_subdirectories_as_single_entries() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    for (root, len) in [(left.path(), 1usize), (right.path(), 999)] {
        let sub = root.join("sub");
        fs::create_dir(&sub)?;
        fs::write(sub.join("payload.bin"), vec![b'P'; len])?;
    }

    let flat = compare_directories(
        left.path(),
        right.path(),
        false,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;
    assert!(!flat.recursive);
    assert_eq!(flat.identical.len(), 1);
    assert_eq!(flat.identical[0].relative_path, "sub");
    assert!(!flat.has_differences());

    let deep = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;
    assert_eq!(deep.different.len(), 1);
    assert_eq!(deep.different[0].relative_path, "sub/payload.bin");

    Ok(())
}

#[test]
fn compare_partitions_every_path_and_is_symmetric() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    fs::create_dir_all(left.path().join("shared").join("deep"))?;
    fs::create_dir_all(right.path().join("shared").join("deep"))?;
    fs::create_dir(left.path().join("left-dir"))?;
    write_stamped(&left.path().join("same.txt"), 3, base_time())?;
    write_stamped(&right.path().join("same.txt"), 3, base_time())?;
    write_stamped(&left.path().join("shared").join("deep").join("f.txt"), 3, base_time())?;
    write_stamped(&right.path().join("shared").join("deep").join("f.txt"), 8, base_time())?;
    fs::write(right.path().join("shared").join("extra.txt"), b"extra")?;

    let compare = |a: &Path, b: &Path| {
        compare_directories(
            a,
            b,
            true,
            ScanOptions::default(),
            &CancelFlag::new(),
            &mut NoProgress,
        )
    };

    let forward = compare(left.path(), right.path())?;
    let mut keys: Vec<&str> = forward
        .identical
        .iter()
        .map(|m| m.relative_path.as_str())
        .chain(forward.different.iter().map(|d| d.relative_path.as_str()))
        .chain(forward.only_in_left.iter().map(|s| s.relative_path.as_str()))
        .chain(forward.only_in_right.iter().map(|s| s.relative_path.as_str()))
        .collect();
    let total = keys.len();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), total, "a path landed in two buckets");
    assert_eq!(
        keys,
        [
            "left-dir",
            "same.txt",
            "shared",
            "shared/deep",
            "shared/deep/f.txt",
            "shared/extra.txt"
        ]
    );

    let backward = compare(right.path(), left.path())?;
    assert_eq!(backward, forward.clone().swapped());

    let again = compare(left.path(), right.path())?;
    assert_eq!(again, forward);

    Ok(())
}

#[test]
fn comparing_a_tree_with_itself_finds_no_differences() -> Result<()> {
    let root = TempDir::new()?;
    fs::create_dir_all(root.path().join("a").join("b"))?;
    fs::write(root.path().join("a").join("b").join("c.txt"), b"content")?;
    fs::write(root.path().join("top.txt"), b"top")?;

    let result = compare_directories(
        root.path(),
        root.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;

    assert!(!result.has_differences());
    assert_eq!(result.summary.identical, 4);
    assert_eq!(result.summary.total_left, result.summary.total_right);

    Ok(())
}

#[test]
fn compare_against_empty_puts_everything_on_the_left() -> Result<()> {
    let root = TempDir::new()?;
    fs::create_dir(root.path().join("dir"))?;
    fs::write(root.path().join("dir").join("file.txt"), b"data")?;

    let context = ScanContext::new(ScanOptions::default(), CancelFlag::new());
    let result = compare_against_empty(root.path(), true, &context, &mut NoProgress)?;

    assert_eq!(result.summary.only_in_left, 2);
    assert_eq!(result.summary.total_right, 0);
    assert!(result.identical.is_empty());
    assert!(result.different.is_empty());

    Ok(())
}

#[test]
fn compare_rejects_invalid_roots() -> Result<()> {
    let root = TempDir::new()?;
    let missing = root.path().join("missing");

    let err = match compare_directories(
        root.path(),
        &missing,
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    ) {
        Ok(_) => bail!("comparison with a missing root should fail"),
        Err(err) => err,
    };

    assert!(matches!(err, ScanError::InvalidRoot { .. }));
    assert!(!err.is_cancelled());

    Ok(())
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_is_empty_and_scan_continues() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new()?;
    fs::write(root.path().join("top.bin"), [b'T'; 10])?;
    let open = root.path().join("open");
    fs::create_dir(&open)?;
    fs::write(open.join("visible.bin"), [b'V'; 20])?;
    let locked = root.path().join("locked");
    fs::create_dir(&locked)?;
    fs::write(locked.join("secret.bin"), [b'S'; 100])?;

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
    if fs::read_dir(&locked).is_ok() {
        // Permission bits do not apply to a privileged user.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let errors = ErrorStats::default();
    let context = ScanContext::with_errors(ScanOptions::default(), CancelFlag::new(), errors.clone());
    let result = aggregate_sizes(root.path(), &context, &mut NoProgress);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
    let tree = result?;

    assert_eq!(tree.size, 30);
    assert_eq!(tree.file_count, 2);
    assert_eq!(tree.folder_count, 2);
    let locked_node = tree
        .find(&locked)
        .ok_or_else(|| anyhow::anyhow!("locked folder missing from tree"))?;
    assert_eq!(locked_node.size, 0);
    assert_eq!(locked_node.file_count, 0);
    assert_eq!(errors.count(ScanErrorKind::AccessDenied), 1);

    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn names_that_are_not_utf8_keep_separate_keys() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let left = TempDir::new()?;
    let right = TempDir::new()?;
    let shared = OsStr::from_bytes(b"\xff");
    let left_only = OsStr::from_bytes(b"\xfe");
    write_stamped(&left.path().join(shared), 4, base_time())?;
    write_stamped(&left.path().join(left_only), 4, base_time())?;
    write_stamped(&right.path().join(shared), 4, base_time())?;

    let result = compare_directories(
        left.path(),
        right.path(),
        true,
        ScanOptions::default(),
        &CancelFlag::new(),
        &mut NoProgress,
    )?;

    assert_eq!(result.summary.total_left, 2);
    assert_eq!(result.identical.len(), 1);
    assert_eq!(result.identical[0].left.path, left.path().join(shared));
    assert_eq!(result.only_in_left.len(), 1);
    assert_eq!(result.only_in_left[0].entry.path, left.path().join(left_only));
    assert!(result.only_in_right.is_empty());

    Ok(())
}

#[test]
fn compare_progress_never_goes_backwards() -> Result<()> {
    let left = TempDir::new()?;
    let right = TempDir::new()?;
    for index in 0..5 {
        let name = format!("file-{index}.txt");
        write_stamped(&left.path().join(&name), 6, base_time())?;
        write_stamped(&right.path().join(&name), 6, base_time())?;
    }

    let mut seen = Vec::new();
    let mut sink = |progress: &CompareProgress| {
        seen.push((progress.phase, progress.current, progress.total, progress.percentage));
    };
    compare_directories(
        left.path(),
        right.path(),
        true,
        unthrottled(),
        &CancelFlag::new(),
        &mut sink,
    )?;

    assert!(seen.len() > 10);
    for pair in seen.windows(2) {
        let (before, after) = (pair[0], pair[1]);
        assert!(after.1 >= before.1, "current decreased: {before:?} -> {after:?}");
        assert!(after.2 >= before.2, "total decreased: {before:?} -> {after:?}");
        assert!(after.3 >= before.3, "percentage decreased: {before:?} -> {after:?}");
    }
    let scanning = seen
        .iter()
        .take_while(|p| p.0 == ComparePhase::Scanning)
        .count();
    assert_eq!(scanning, 10);
    assert_eq!(seen.last().copied(), Some((ComparePhase::Comparing, 15, 15, 100)));

    Ok(())
}

#[cfg(unix)]
#[test]
fn size_percentage_counts_unfollowed_links_as_done() -> Result<()> {
    let root = TempDir::new()?;
    fs::create_dir(root.path().join("b_real"))?;
    fs::create_dir(root.path().join("c_real"))?;
    std::os::unix::fs::symlink(root.path().join("b_real"), root.path().join("a_link"))?;

    let mut percentages = Vec::new();
    let mut sink = |progress: &SizeProgress| percentages.push(progress.percentage);
    let tree = scan_directory_size(root.path(), unthrottled(), &CancelFlag::new(), &mut sink)?;

    assert_eq!(percentages, [0, 33, 66, 100]);
    assert_eq!(tree.folder_count, 2);

    Ok(())
}
