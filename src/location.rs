//! Location resolution: where an artifact lives on disk
//!
//! Every path the archive ever writes is computed here, so filenames stay stable
//! across runs. The computation is pure: no filesystem access, no failure modes.
//!
//! Layout under the storage root:
//!
//! ```text
//! authors/<author>/all/<name>              primary for followed authors
//! authors/<author>/<category>/<name>
//! saved/all/<name>                         primary for saved posts
//! saved/<category>/<name>
//! categories/<category>/<name with author>
//! all/<name with author>
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::media::Metadata;
use crate::types::ViewKind;

/// Maximum filename length in bytes
pub const MAX_FILENAME_BYTES: usize = 250;

const SEPARATOR: &str = " - ";

#[allow(clippy::expect_used)]
static WINDOWS_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid static pattern"));

#[allow(clippy::expect_used)]
static STRICT_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w \-]").expect("valid static pattern"));

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid static pattern"));

/// Which characters are replaced when building filenames
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameRules {
    /// Replace only the characters Windows forbids: `\ / : * ? " < > |`
    Windows,
    /// Replace anything that is not a word character, a space or `-`
    Strict,
}

impl Default for FilenameRules {
    fn default() -> Self {
        if cfg!(windows) {
            FilenameRules::Windows
        } else {
            FilenameRules::Strict
        }
    }
}

impl FilenameRules {
    fn illegal(&self) -> &'static Regex {
        match self {
            FilenameRules::Windows => &WINDOWS_ILLEGAL,
            FilenameRules::Strict => &STRICT_ILLEGAL,
        }
    }
}

/// Make `name` safe to use as a single path component
///
/// Illegal characters become `_`, whitespace runs collapse to one space, leading
/// whitespace is dropped, the result is cut to [`MAX_FILENAME_BYTES`] and trailing
/// periods and whitespace are removed. Applying it twice changes nothing.
pub fn normalize_filename(name: &str, rules: FilenameRules) -> String {
    let replaced = rules.illegal().replace_all(name, "_");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    let trimmed = collapsed.trim_start();

    let mut end = trimmed.len().min(MAX_FILENAME_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }

    // trailing periods break directory handling on some platforms
    let result = trimmed[..end].trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    if result.is_empty() {
        "_".to_string()
    } else {
        result.to_string()
    }
}

/// Where one artifact is written and linked
///
/// Bytes are only ever written at `primary`; each secondary becomes a hard link
/// to it. Paths carry no extension, the saver appends the one the download
/// produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalLocation {
    /// The single write location
    pub primary: PathBuf,
    /// Alternate views, never containing `primary`
    pub secondaries: BTreeSet<PathBuf>,
}

impl LocalLocation {
    /// Build a location, dropping any secondary equal to the primary
    pub fn new(primary: PathBuf, secondaries: impl IntoIterator<Item = PathBuf>) -> Self {
        let secondaries = secondaries
            .into_iter()
            .filter(|path| *path != primary)
            .collect();
        Self {
            primary,
            secondaries,
        }
    }
}

/// Computes [`LocalLocation`]s under a storage root
#[derive(Clone, Debug)]
pub struct LocationResolver {
    root: PathBuf,
    rules: FilenameRules,
}

impl LocationResolver {
    /// Create a resolver rooted at `root`
    pub fn new(root: impl Into<PathBuf>, rules: FilenameRules) -> Self {
        Self {
            root: root.into(),
            rules,
        }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filename rules in use
    pub fn rules(&self) -> FilenameRules {
        self.rules
    }

    /// Filename for `metadata`, optionally including the author
    ///
    /// Components are `position, date, author, id, title`, absent ones skipped.
    pub fn filename(&self, metadata: &Metadata, with_author: bool) -> String {
        let position = metadata.position.map(|p| p.to_string());
        let date = metadata.date.map(|d| d.format("%Y-%m-%d").to_string());
        let author = with_author.then_some(metadata.author.as_str());
        let title = metadata.title.as_deref().filter(|t| !t.trim().is_empty());

        let parts: Vec<&str> = [
            position.as_deref(),
            date.as_deref(),
            author,
            Some(metadata.id.as_str()),
            title,
        ]
        .into_iter()
        .flatten()
        .collect();

        normalize_filename(&parts.join(SEPARATOR), self.rules)
    }

    /// Location of a top-level artifact in the given view
    pub fn resolve_top(&self, metadata: &Metadata, view: ViewKind) -> LocalLocation {
        let base = match view {
            ViewKind::FollowedAuthor => self
                .root
                .join("authors")
                .join(normalize_filename(&metadata.author, self.rules)),
            ViewKind::SavedPost => self.root.join("saved"),
        };

        let name = self.filename(metadata, false);
        let name_with_author = self.filename(metadata, true);

        let mut secondaries = Vec::with_capacity(3);
        if let Some(category) = &metadata.category {
            let category = normalize_filename(category, self.rules);
            secondaries.push(base.join(&category).join(&name));
            secondaries.push(
                self.root
                    .join("categories")
                    .join(&category)
                    .join(&name_with_author),
            );
        }
        secondaries.push(self.root.join("all").join(&name_with_author));

        LocalLocation::new(base.join("all").join(&name), secondaries)
    }

    /// Location of a child of the artifact at `parent` (e.g. an album entry)
    ///
    /// The child's name is appended under the parent's primary and under every
    /// parent secondary, producing parallel trees.
    pub fn resolve_child(&self, metadata: &Metadata, parent: &LocalLocation) -> LocalLocation {
        let name = self.filename(metadata, false);
        LocalLocation::new(
            parent.primary.join(&name),
            parent.secondaries.iter().map(|s| s.join(&name)),
        )
    }
}
