//! Utility functions for file operations and path manipulation

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Append `.ext` to a path without replacing anything
///
/// Unlike [`Path::with_extension`], dots already present in the final component
/// are kept, which matters for names such as `1970-01-01 - id - v1.2`.
///
/// # Examples
///
/// ```
/// use feed_archiver::utils::append_extension;
/// use std::path::{Path, PathBuf};
///
/// let path = append_extension(Path::new("saved/all/abc - v1.2"), "png");
/// assert_eq!(path, PathBuf::from("saved/all/abc - v1.2.png"));
/// ```
#[must_use]
pub fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether a file was actually removed.
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recursively remove a directory, treating "already gone" as success
///
/// Returns whether a directory was actually removed.
pub async fn remove_dir_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Create the parent directory of `path` if it has one
pub async fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await
        }
        _ => Ok(()),
    }
}

/// Verify that the filesystem under `root` supports hard links
///
/// Creates `root` if needed, then links a probe file inside it. Both probe
/// entries are removed afterwards.
///
/// # Errors
///
/// Returns [`Error::NotSupported`] when the link cannot be created, and
/// [`Error::Io`] when `root` itself is unusable.
pub async fn check_hard_link_support(root: &Path) -> Result<()> {
    tokio::fs::create_dir_all(root).await?;

    let probe = root.join(format!(".feed-archiver-link-probe-{}", std::process::id()));
    let link = append_extension(&probe, "link");

    // leftovers from a crashed run would make create/link fail spuriously
    remove_file_if_exists(&probe).await?;
    remove_file_if_exists(&link).await?;

    tokio::fs::write(&probe, b"probe").await?;
    let linked = tokio::fs::hard_link(&probe, &link).await;

    let cleanup_link = remove_file_if_exists(&link).await;
    let cleanup_probe = remove_file_if_exists(&probe).await;

    if let Err(e) = linked {
        return Err(Error::NotSupported(format!(
            "hard links are not available under {}: {}",
            root.display(),
            e
        )));
    }

    cleanup_link?;
    cleanup_probe?;
    Ok(())
}
