//! Link fan-out from a saved primary file to its secondary views

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::SaveFailure;
use crate::location::LocalLocation;
use crate::types::SaveOutcome;
use crate::utils::{
    append_extension, create_parent_dir, remove_dir_if_exists, remove_file_if_exists,
};

/// Paths written by one save, so an enclosing album can undo exactly those
#[derive(Debug, Default)]
pub(crate) struct Created {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl Created {
    pub(crate) fn file(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    /// Record a directory that did not exist before this save
    pub(crate) fn dir(&mut self, path: PathBuf) {
        self.dirs.push(path);
    }

    pub(crate) fn absorb(&mut self, other: Created) {
        self.files.extend(other.files);
        self.dirs.extend(other.dirs);
    }

    #[cfg(test)]
    pub(crate) fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Remove every recorded file, then every recorded directory tree, newest
    /// first
    ///
    /// Returns a description of each path that could not be removed.
    pub(crate) async fn undo(self) -> Vec<String> {
        let mut leftovers = Vec::new();
        for path in self.files.iter().rev() {
            if let Err(e) = remove_file_if_exists(path).await {
                leftovers.push(format!("{}: {}", path.display(), e));
            }
        }
        for dir in self.dirs.iter().rev() {
            if let Err(e) = remove_dir_if_exists(dir).await {
                leftovers.push(format!("{}: {}", dir.display(), e));
            }
        }
        leftovers
    }
}

/// Hard-link `<secondary>.<extension>` to `<primary>.<extension>` for every
/// secondary of `location`
///
/// Returns `Saved` pointing at the primary file. A secondary that already exists
/// is left alone. On success the primary and every link made here are recorded
/// in `created`. If any directory or link cannot be created, the primary and the
/// links made by this call are removed and the outcome is `Failure`, or
/// `Corrupted` when that removal fails too.
pub(crate) async fn fan_out(
    location: &LocalLocation,
    extension: &str,
    bytes: u64,
    created: &mut Created,
) -> SaveOutcome {
    let primary = append_extension(&location.primary, extension);
    let mut linked: Vec<PathBuf> = Vec::with_capacity(location.secondaries.len());

    for secondary in &location.secondaries {
        let link = append_extension(secondary, extension);
        match link_one(&primary, &link).await {
            Ok(true) => linked.push(link),
            Ok(false) => debug!(path = ?link, "secondary already present"),
            Err(e) => {
                warn!(primary = ?primary, link = ?link, error = %e, "failed to link secondary");
                let failure =
                    SaveFailure::with_cause(format!("failed to link {}", link.display()), e);
                return rollback(&primary, &linked, failure).await;
            }
        }
    }

    created.file(primary.clone());
    for link in linked {
        created.file(link);
    }
    SaveOutcome::Saved {
        path: primary,
        bytes,
    }
}

async fn link_one(primary: &Path, link: &Path) -> std::io::Result<bool> {
    create_parent_dir(link).await?;
    match tokio::fs::hard_link(primary, link).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

async fn rollback(primary: &Path, created: &[PathBuf], failure: SaveFailure) -> SaveOutcome {
    let mut leftovers = Vec::new();
    for path in std::iter::once(primary).chain(created.iter().map(PathBuf::as_path)) {
        if let Err(e) = remove_file_if_exists(path).await {
            leftovers.push(format!("{}: {}", path.display(), e));
        }
    }

    if leftovers.is_empty() {
        return SaveOutcome::Failure(failure);
    }

    error!(
        primary = ?primary,
        leftovers = %leftovers.join("; "),
        "rollback after link failure did not complete"
    );
    SaveOutcome::Corrupted(SaveFailure {
        message: format!(
            "{}; cleanup failed for {}",
            failure.message,
            leftovers.join("; ")
        ),
        cause: failure.cause,
    })
}
