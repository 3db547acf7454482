//! Media resolution: turning a link into something downloadable
//!
//! ## Architecture
//!
//! Each content host is one [`MediaResolver`]. A [`ResolverChain`] holds them in
//! priority order and hands a URL to the first whose `matches` returns true:
//!
//! - [`Denylist`]: configured domains, category index pages, deletion placeholders
//! - [`DirectLink`]: paths ending in a media extension
//! - [`RedditUploads`]: `i.reddituploads.com`
//! - [`ImgurImage`] / [`ImgurAlbum`]: Imgur pages, via the Imgur API
//! - [`HostedVideo`]: video hosts, delegated to the external extractor
//!
//! A URL nobody matches is reported as [`Dispatch::NotMatched`] and never fetched.

mod denylist;
mod direct;
mod imgur;
mod traits;
mod video_hosts;

pub use denylist::Denylist;
pub use direct::{DirectLink, RedditUploads};
pub use imgur::{ImgurAlbum, ImgurApi, ImgurImage};
pub use traits::{MediaResolver, ResolveError, ResolveResult, path_segments, registrable_domain};
pub use video_hosts::{HostedVideo, VIDEO_HOSTS};

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;
use crate::media::Metadata;

/// Result of running a URL through the chain
#[derive(Debug)]
pub enum Dispatch {
    /// A resolver matched and produced `result`
    Resolved {
        /// Name of the resolver that handled the URL
        resolver: &'static str,
        /// What it produced
        result: ResolveResult,
    },
    /// No resolver recognizes the URL
    NotMatched,
}

/// Ordered list of resolvers; first match wins
#[derive(Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn MediaResolver>>,
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ResolverChain {
    /// Chain over the given resolvers, in priority order
    pub fn new(resolvers: Vec<Arc<dyn MediaResolver>>) -> Self {
        Self { resolvers }
    }

    /// The bundled resolvers in their standard order
    ///
    /// `client` is used for host API calls (Imgur).
    pub fn standard(config: &ResolverConfig, client: reqwest::Client) -> Self {
        let imgur = ImgurApi::new(
            client,
            config.imgur_api_base.clone(),
            config.imgur_client_id.clone(),
        );

        Self::new(vec![
            Arc::new(Denylist::new(&config.ignored_domains)),
            Arc::new(DirectLink),
            Arc::new(RedditUploads),
            Arc::new(ImgurImage::new(imgur.clone())),
            Arc::new(ImgurAlbum::new(imgur)),
            Arc::new(HostedVideo),
        ])
    }

    /// Append a resolver at the lowest priority
    pub fn push(&mut self, resolver: Arc<dyn MediaResolver>) {
        self.resolvers.push(resolver);
    }

    /// Insert a resolver at `index` (0 = highest priority)
    ///
    /// Indices past the end append.
    pub fn insert(&mut self, index: usize, resolver: Arc<dyn MediaResolver>) {
        let index = index.min(self.resolvers.len());
        self.resolvers.insert(index, resolver);
    }

    /// Number of resolvers
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain has no resolvers
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolver names in priority order
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// First resolver that matches `url`
    pub fn find(&self, url: &Url) -> Option<&Arc<dyn MediaResolver>> {
        self.resolvers.iter().find(|r| r.matches(url))
    }

    /// Resolve `url` with the first matching resolver
    pub async fn dispatch(&self, metadata: &Metadata, url: &Url) -> Dispatch {
        let Some(resolver) = self.find(url) else {
            debug!(post_id = %metadata.id, %url, "no resolver matched");
            return Dispatch::NotMatched;
        };

        debug!(post_id = %metadata.id, %url, resolver = resolver.name(), "dispatching");
        Dispatch::Resolved {
            resolver: resolver.name(),
            result: resolver.resolve(metadata, url).await,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Media;
    use async_trait::async_trait;

    struct Fixed(&'static str, ResolveKind);

    #[derive(Clone, Copy)]
    enum ResolveKind {
        Ignored,
        NotFound,
    }

    #[async_trait]
    impl MediaResolver for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some("fixed.example")
        }

        async fn resolve(&self, _metadata: &Metadata, _url: &Url) -> ResolveResult {
            match self.1 {
                ResolveKind::Ignored => ResolveResult::Ignored,
                ResolveKind::NotFound => ResolveResult::NotFound,
            }
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn standard() -> ResolverChain {
        ResolverChain::standard(&ResolverConfig::default(), reqwest::Client::new())
    }

    #[test]
    fn standard_chain_order() {
        assert_eq!(
            standard().names(),
            vec![
                "denylist",
                "direct-link",
                "reddit-uploads",
                "imgur-image",
                "imgur-album",
                "hosted-video"
            ]
        );
    }

    #[test]
    fn first_match_wins() {
        let chain = standard();

        // placeholder ends in .png but the denylist comes first
        let placeholder = url("https://i.imgur.com/removed.png");
        assert_eq!(chain.find(&placeholder).unwrap().name(), "denylist");

        let direct = url("https://i.imgur.com/AbC.png");
        assert_eq!(chain.find(&direct).unwrap().name(), "direct-link");

        let gifv = url("https://i.imgur.com/AbC.gifv");
        assert_eq!(chain.find(&gifv).unwrap().name(), "imgur-image");
    }

    #[tokio::test]
    async fn unmatched_urls_are_reported() {
        let chain = standard();
        let dispatch = chain
            .dispatch(&Metadata::new("a", "b"), &url("https://example.com/article"))
            .await;
        assert!(matches!(dispatch, Dispatch::NotMatched));
    }

    #[tokio::test]
    async fn inserted_resolver_takes_priority() {
        let mut chain = ResolverChain::new(vec![Arc::new(Fixed("later", ResolveKind::NotFound))]);
        chain.insert(0, Arc::new(Fixed("first", ResolveKind::Ignored)));
        chain.push(Arc::new(DirectLink));

        assert_eq!(chain.len(), 3);
        match chain
            .dispatch(&Metadata::new("a", "b"), &url("https://fixed.example/x"))
            .await
        {
            Dispatch::Resolved { resolver, result } => {
                assert_eq!(resolver, "first");
                assert!(matches!(result, ResolveResult::Ignored));
            }
            Dispatch::NotMatched => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn direct_links_dispatch_to_files() {
        let chain = standard();
        let link = url("https://i.redd.it/abc.jpg");
        match chain.dispatch(&Metadata::new("abc", "alice"), &link).await {
            Dispatch::Resolved {
                result: ResolveResult::Success(Media::File { urls, .. }),
                ..
            } => assert_eq!(urls, vec![link]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_chain_matches_nothing() {
        let chain = ResolverChain::default();
        assert!(chain.is_empty());
        assert!(chain.find(&url("https://i.redd.it/abc.jpg")).is_none());
    }
}
