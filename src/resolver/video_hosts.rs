//! Hosts whose pages are handed to the external video extractor

use async_trait::async_trait;
use url::Url;

use super::traits::{MediaResolver, ResolveResult};
use crate::media::{Media, Metadata};

/// Hosts recognized by [`HostedVideo`]
pub const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "v.redd.it",
];

/// Video pages on known hosts; resolved to [`Media::Video`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HostedVideo;

#[async_trait]
impl MediaResolver for HostedVideo {
    fn name(&self) -> &'static str {
        "hosted-video"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| VIDEO_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)))
    }

    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
        ResolveResult::Success(Media::Video {
            metadata: metadata.clone(),
            url: url.clone(),
        })
    }
}
