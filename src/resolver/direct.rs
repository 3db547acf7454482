//! Resolvers for links that already point at the bytes

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::traits::{MediaResolver, ResolveResult};
use crate::media::{Media, Metadata};

#[allow(clippy::expect_used)]
static MEDIA_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[^/]+\.(jpg|jpeg|png|gif|mp4|webm)$").expect("valid static pattern")
});

/// Links whose last path segment is a file name with a known media extension
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectLink;

#[async_trait]
impl MediaResolver for DirectLink {
    fn name(&self) -> &'static str {
        "direct-link"
    }

    fn matches(&self, url: &Url) -> bool {
        MEDIA_PATH.is_match(url.path())
    }

    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
        ResolveResult::Success(Media::file(metadata.clone(), url.clone()))
    }
}

/// Reddit's legacy image upload host
#[derive(Debug, Default, Clone, Copy)]
pub struct RedditUploads;

#[async_trait]
impl MediaResolver for RedditUploads {
    fn name(&self) -> &'static str {
        "reddit-uploads"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("i.reddituploads.com")
    }

    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
        ResolveResult::Success(Media::file(metadata.clone(), url.clone()))
    }
}
