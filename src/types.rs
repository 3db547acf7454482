//! Core types: feed records, views, save outcomes and run summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SaveFailure;
use crate::media::Metadata;

/// One record from a feed source
///
/// The orchestrator only reads these; where they come from (API pagination,
/// authentication, exported JSON) is the caller's concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Stable post identifier
    pub id: String,
    /// Author username
    pub author: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Post title
    #[serde(default)]
    pub title: Option<String>,
    /// Category the post belongs to (e.g. subreddit)
    #[serde(default)]
    pub category: Option<String>,
    /// Link the post points to
    pub url: String,
    /// Link to the post itself, used in reports
    #[serde(default)]
    pub permalink: Option<String>,
    /// Pinned by moderators
    #[serde(default)]
    pub is_sticky: bool,
    /// Has no link, only text
    #[serde(default)]
    pub is_text_only: bool,
    /// Marked as not safe for work
    #[serde(default)]
    pub is_nsfw: bool,
    /// Net votes
    #[serde(default)]
    pub score: i64,
}

impl Post {
    /// Human-facing reference to the post: its permalink, or its id
    pub fn reference(&self) -> &str {
        self.permalink.as_deref().unwrap_or(&self.id)
    }
}

impl From<&Post> for Metadata {
    fn from(post: &Post) -> Self {
        Metadata {
            id: post.id.clone(),
            author: post.author.clone(),
            date: post.created_at,
            title: post.title.clone(),
            category: post.category.clone(),
            position: None,
        }
    }
}

/// Which view a feed is saved under
///
/// The view picks the primary directory; secondary views are derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Posts the user saved, stored under `saved/`
    SavedPost,
    /// Posts by followed authors, stored under `authors/<author>/`
    FollowedAuthor,
}

impl ViewKind {
    /// Kebab-case name, as used in configuration and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::SavedPost => "saved-post",
            ViewKind::FollowedAuthor => "followed-author",
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "saved-post" | "saved" => Ok(ViewKind::SavedPost),
            "followed-author" | "author" => Ok(ViewKind::FollowedAuthor),
            other => Err(format!(
                "unknown view {other:?} (expected saved-post or followed-author)"
            )),
        }
    }
}

/// Result of saving one item
#[derive(Debug)]
pub enum SaveOutcome {
    /// Newly written; `path` is the primary file (with extension) or album directory
    Saved {
        /// Primary location of the artifact
        path: PathBuf,
        /// Bytes written (sum of children for albums)
        bytes: u64,
    },
    /// The primary already exists on disk; nothing was fetched
    AlreadySaved,
    /// Deliberately skipped by a resolver
    Ignored,
    /// Confirmed gone upstream
    NotFound,
    /// No resolver recognizes the URL
    NotMatched,
    /// Anything else; disk state was rolled back
    Failure(SaveFailure),
    /// Rollback itself failed; primary and secondaries may disagree
    Corrupted(SaveFailure),
}

impl SaveOutcome {
    /// Shorthand for a failure without a cause
    pub fn failure(message: impl Into<String>) -> Self {
        SaveOutcome::Failure(SaveFailure::new(message))
    }

    /// Shorthand for a failure with a cause
    pub fn failure_with(message: impl Into<String>, cause: impl Into<crate::Error>) -> Self {
        SaveOutcome::Failure(SaveFailure::with_cause(message, cause))
    }

    /// True for `Saved` and `AlreadySaved`
    pub fn is_success(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. } | SaveOutcome::AlreadySaved)
    }

    /// True for `Failure` and `Corrupted`
    pub fn is_failure(&self) -> bool {
        matches!(self, SaveOutcome::Failure(_) | SaveOutcome::Corrupted(_))
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            SaveOutcome::Saved { .. } => "saved",
            SaveOutcome::AlreadySaved => "already saved",
            SaveOutcome::Ignored => "ignored",
            SaveOutcome::NotFound => "not found",
            SaveOutcome::NotMatched => "not matched",
            SaveOutcome::Failure(_) => "failed",
            SaveOutcome::Corrupted(_) => "corrupted",
        }
    }
}

impl std::fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveOutcome::Saved { path, bytes } => {
                write!(f, "saved {} bytes to {}", bytes, path.display())
            }
            SaveOutcome::Failure(failure) => write!(f, "failed: {}", failure.detail()),
            SaveOutcome::Corrupted(failure) => write!(f, "corrupted: {}", failure.detail()),
            other => f.write_str(other.label()),
        }
    }
}

/// One reported item in a [`RunSummary`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Post reference (permalink or id)
    pub reference: String,
    /// Link the post pointed to
    pub url: String,
    /// Failure detail, for failed and corrupted items
    pub message: Option<String>,
}

/// Aggregate of per-item outcomes for one run
///
/// Built by folding outcomes with [`RunSummary::record`]; the saver itself keeps
/// no state between items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Items newly saved
    pub saved: usize,
    /// Items found on disk already
    pub already_saved: usize,
    /// Total bytes written
    pub bytes: u64,
    /// Posts skipped by view filters before saving
    pub filtered: usize,
    /// Items skipped by a resolver
    pub ignored: Vec<ReportEntry>,
    /// Items gone upstream
    pub not_found: Vec<ReportEntry>,
    /// Items no resolver recognized
    pub not_matched: Vec<ReportEntry>,
    /// Items that failed
    pub failed: Vec<ReportEntry>,
    /// Items whose rollback failed
    pub corrupted: Vec<ReportEntry>,
}

impl RunSummary {
    /// Fold one outcome into the summary
    pub fn record(&mut self, post: &Post, outcome: &SaveOutcome) {
        let entry = |message: Option<String>| ReportEntry {
            reference: post.reference().to_string(),
            url: post.url.clone(),
            message,
        };

        match outcome {
            SaveOutcome::Saved { bytes, .. } => {
                self.saved += 1;
                self.bytes += bytes;
            }
            SaveOutcome::AlreadySaved => self.already_saved += 1,
            SaveOutcome::Ignored => self.ignored.push(entry(None)),
            SaveOutcome::NotFound => self.not_found.push(entry(None)),
            SaveOutcome::NotMatched => self.not_matched.push(entry(None)),
            SaveOutcome::Failure(failure) => self.failed.push(entry(Some(failure.detail()))),
            SaveOutcome::Corrupted(failure) => {
                self.corrupted.push(entry(Some(failure.detail())))
            }
        }
    }

    /// Combine two summaries (e.g. one per feed)
    pub fn merge(&mut self, other: RunSummary) {
        self.saved += other.saved;
        self.already_saved += other.already_saved;
        self.bytes += other.bytes;
        self.filtered += other.filtered;
        self.ignored.extend(other.ignored);
        self.not_found.extend(other.not_found);
        self.not_matched.extend(other.not_matched);
        self.failed.extend(other.failed);
        self.corrupted.extend(other.corrupted);
    }

    /// Saved plus already saved
    pub fn successful(&self) -> usize {
        self.saved + self.already_saved
    }

    /// Whether any item failed or left disk state inconsistent
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.corrupted.is_empty()
    }
}
