//! Existence probe: has this artifact been saved before?
//!
//! A fixed set of `stat` calls against the primary path. The filesystem is the
//! only record of what has been archived, so this is what makes re-runs cheap.

use crate::location::LocalLocation;
use crate::transport::known_extensions;
use crate::utils::append_extension;

/// Whether the artifact at `location` already exists
///
/// True when the primary is a directory (an album) or `<primary>.<ext>` exists
/// for any extension a save can produce. Probe errors count as "not saved"; the
/// save that follows fails loudly if the path is really unusable.
pub async fn is_saved(location: &LocalLocation) -> bool {
    if let Ok(metadata) = tokio::fs::metadata(&location.primary).await
        && metadata.is_dir()
    {
        return true;
    }

    for extension in known_extensions() {
        let candidate = append_extension(&location.primary, extension);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return true;
        }
    }

    false
}
