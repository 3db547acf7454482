//! Custom assertions over the archive tree

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file under `root`, relative to it, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

/// Every directory under `root` (excluding `root`), relative to it, sorted
pub fn dirs_under(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs
}

/// Assert `paths` are all hard links of one file
#[cfg(unix)]
pub fn assert_same_inode(paths: &[PathBuf]) {
    use std::os::unix::fs::MetadataExt;

    let Some((first, rest)) = paths.split_first() else {
        return;
    };
    let expected = std::fs::metadata(first)
        .unwrap_or_else(|e| panic!("{} missing: {e}", first.display()))
        .ino();
    for path in rest {
        let inode = std::fs::metadata(path)
            .unwrap_or_else(|e| panic!("{} missing: {e}", path.display()))
            .ino();
        assert_eq!(
            inode,
            expected,
            "{} is not a hard link of {}",
            path.display(),
            first.display()
        );
    }
}

/// Assert that no regular file exists anywhere under `root`
pub fn assert_no_files(root: &Path) {
    let files = files_under(root);
    assert!(files.is_empty(), "expected no files, found {files:?}");
}
