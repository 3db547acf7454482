//! Media model: what a feed item resolves to
//!
//! These are plain values. A [`Metadata`] identifies one logical artifact
//! independently of where it ends up on disk; [`Media`] describes how its bytes
//! are obtained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identity of one logical artifact (a post, or one child of an album)
///
/// The `id` must be stable across runs for the same artifact: together with
/// `date`, `title` and `position` it determines the on-disk filename.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Stable identifier assigned by the source (post id, image hash, ...)
    pub id: String,
    /// Author of the post; empty for album children
    pub author: String,
    /// Creation time of the post
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Title or caption
    #[serde(default)]
    pub title: Option<String>,
    /// Category the post was published in (subreddit, board, tag)
    #[serde(default)]
    pub category: Option<String>,
    /// 1-based position inside an album
    #[serde(default)]
    pub position: Option<u32>,
}

impl Metadata {
    /// Create metadata with only the required fields set
    pub fn new(id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            date: None,
            title: None,
            category: None,
            position: None,
        }
    }

    /// Metadata for a child of an album: no author, no category
    pub fn child(id: impl Into<String>, title: Option<String>, position: u32) -> Self {
        Self {
            title,
            position: Some(position),
            ..Self::new(id, "")
        }
    }

    /// Set the creation time
    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the album position
    #[must_use]
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Resolved content of a URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Media {
    /// A single downloadable artifact
    File {
        /// Identity of the file
        metadata: Metadata,
        /// Alternative source URLs (mirrors, formats), tried in order
        urls: Vec<Url>,
    },
    /// An ordered collection of media saved into one directory
    Album {
        /// Identity of the album
        metadata: Metadata,
        /// Children, each saved under the album's directory
        children: Vec<Media>,
    },
    /// A video fetched by the external extraction tool
    Video {
        /// Identity of the video
        metadata: Metadata,
        /// Page URL handed to the extractor
        url: Url,
    },
}

impl Media {
    /// A file with a single source URL
    pub fn file(metadata: Metadata, url: Url) -> Self {
        Media::File {
            metadata,
            urls: vec![url],
        }
    }

    /// Identity of this media
    pub fn metadata(&self) -> &Metadata {
        match self {
            Media::File { metadata, .. }
            | Media::Album { metadata, .. }
            | Media::Video { metadata, .. } => metadata,
        }
    }

    /// Short name of the variant for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Media::File { .. } => "file",
            Media::Album { .. } => "album",
            Media::Video { .. } => "video",
        }
    }
}
