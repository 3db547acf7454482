//! Traits and types for media resolution

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::error::SaveFailure;
use crate::media::{Media, Metadata};

/// Why a resolver could not produce media for a URL it matched
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ResolveError {
    /// Human-readable description
    pub message: String,
    /// The underlying error, if any
    #[source]
    pub cause: Option<crate::Error>,
}

impl ResolveError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create an error with a message and an underlying cause
    pub fn with_cause(message: impl Into<String>, cause: impl Into<crate::Error>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

impl From<ResolveError> for SaveFailure {
    fn from(error: ResolveError) -> Self {
        SaveFailure {
            message: error.message,
            cause: error.cause,
        }
    }
}

/// Four-way result of resolving one URL
#[derive(Debug)]
pub enum ResolveResult {
    /// The URL resolved to downloadable media
    Success(Media),
    /// The content is confirmed gone (deletion placeholder, provider 404)
    NotFound,
    /// The URL is deliberately excluded; never reported as a failure
    Ignored,
    /// Anything unexpected; surfaced as a failed save
    Error(ResolveError),
}

/// Capability for one content host
///
/// Resolvers are consulted in chain order and the first whose [`matches`]
/// returns true handles the URL. Adding a host means implementing this trait and
/// inserting the resolver into the [`ResolverChain`](super::ResolverChain).
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use feed_archiver::media::{Media, Metadata};
/// use feed_archiver::resolver::{MediaResolver, ResolveResult};
/// use url::Url;
///
/// struct ExampleHost;
///
/// #[async_trait]
/// impl MediaResolver for ExampleHost {
///     fn name(&self) -> &'static str {
///         "example-host"
///     }
///
///     fn matches(&self, url: &Url) -> bool {
///         url.host_str() == Some("media.example.com")
///     }
///
///     async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
///         ResolveResult::Success(Media::file(metadata.clone(), url.clone()))
///     }
/// }
/// ```
///
/// [`matches`]: MediaResolver::matches
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Whether this resolver handles `url`
    ///
    /// Must be cheap and must not perform I/O.
    fn matches(&self, url: &Url) -> bool;

    /// Turn `url` into media described by `metadata`
    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult;
}

/// Last two labels of the URL's host, lowercased
///
/// An approximation of the registrable domain that is exact for the hosts the
/// bundled resolvers care about (`i.imgur.com` → `imgur.com`).
pub fn registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    let mut labels = host.rsplitn(3, '.');
    let tld = labels.next()?;
    match labels.next() {
        Some(name) => Some(format!("{name}.{tld}")),
        None => Some(tld.to_string()),
    }
}

/// Path segments of `url`, empty for URLs that cannot be a base
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments().map(Iterator::collect).unwrap_or_default()
}
