//! Error types for feed-archiver
//!
//! This module provides error handling for the library, including:
//! - A crate-wide [`Error`] type used by every fallible operation
//! - Pipeline-specific [`DownloadError`] variants with contextual fields
//! - [`SaveFailure`], the payload carried by failed save outcomes

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for feed-archiver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feed-archiver
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.max_redirects")
        key: Option<String>,
    },

    /// Configuration file could not be parsed
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Save pipeline error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// External tool execution failed (yt-dlp, youtube-dl)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, filesystem without hard links, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The operation was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Save pipeline errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A file was resolved without any candidate URL
    #[error("media {id} has no candidate urls")]
    NoUrls {
        /// The metadata id of the file
        id: String,
    },

    /// Redirect chain exceeded the configured hop limit
    #[error("exceeded {limit} redirects while fetching {url}")]
    RedirectLimit {
        /// The configured maximum number of hops
        limit: usize,
        /// The URL that would have been fetched next
        url: String,
    },

    /// A redirect pointed somewhere that is not a valid URL
    #[error("malformed redirect location {location:?}: {reason}")]
    MalformedRedirect {
        /// The raw `Location` header value
        location: String,
        /// The reason it could not be used
        reason: String,
    },

    /// The response content type does not map to a known extension
    #[error("unknown content-type {content_type:?} for {url}")]
    UnknownContentType {
        /// The URL that was fetched
        url: String,
        /// The content type sent by the server, if any
        content_type: Option<String>,
    },

    /// The server answered with a status code outside the handled classes
    #[error("unexpected HTTP status {status} for {url}")]
    UnexpectedStatus {
        /// The URL that was fetched
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// Every candidate URL of a file failed
    #[error("unable to fetch any of the media urls: {}", .attempts.join("; "))]
    AllUrlsFailed {
        /// One entry per attempted URL, `<url>: <outcome>`
        attempts: Vec<String>,
    },

    /// A child of an album failed and the album was rolled back
    #[error("album {} child {} failed", .album.display(), .child)]
    AlbumChildFailed {
        /// The album's primary directory
        album: PathBuf,
        /// The id of the failing child
        child: String,
    },
}

/// Failure payload of a save outcome
///
/// Carries a human-readable message and, where available, the underlying cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SaveFailure {
    /// Human-readable description of what failed
    pub message: String,
    /// The underlying error, if any
    #[source]
    pub cause: Option<Error>,
}

impl SaveFailure {
    /// Create a failure with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a failure with a message and an underlying cause
    pub fn with_cause(message: impl Into<String>, cause: impl Into<Error>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Message followed by the cause, for single-line reports
    pub fn detail(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}: {}", self.message, cause),
            None => self.message.clone(),
        }
    }
}

impl From<Error> for SaveFailure {
    fn from(error: Error) -> Self {
        Self {
            message: error.to_string(),
            cause: Some(error),
        }
    }
}
