//! Save orchestration split into focused submodules.
//!
//! The [`Saver`] drives one feed item from post to on-disk artifact:
//! - [`probe`] - existence check that short-circuits re-runs
//! - `media` - recursive saving of files, albums and videos
//! - `links` - hard-link fan-out to secondary views
//!
//! The saver keeps no state between items; outcomes are returned to the caller,
//! which folds them into a [`RunSummary`](crate::types::RunSummary).

mod links;
mod media;
pub mod probe;


use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::location::LocationResolver;
use crate::media::Metadata;
use crate::resolver::ResolverChain;
use crate::transport::Transport;
use crate::types::{Post, SaveOutcome, ViewKind};
use crate::video::{VideoExtractor, extractor_from_config};

/// Saves feed items into hard-linked local views
///
/// Cheap to clone; all components are shared.
#[derive(Clone)]
pub struct Saver {
    /// Configuration (shared across clones)
    pub(crate) config: Arc<Config>,
    /// Computes primary and secondary paths
    pub(crate) locations: LocationResolver,
    /// Ordered host capabilities
    pub(crate) resolvers: ResolverChain,
    /// HTTP downloads
    pub(crate) transport: Transport,
    /// External video tool
    pub(crate) extractor: Arc<dyn VideoExtractor>,
}

impl std::fmt::Debug for Saver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saver")
            .field("root", &self.locations.root())
            .field("resolvers", &self.resolvers)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl Saver {
    /// Build a saver with the standard resolver chain and the configured extractor
    ///
    /// Creates the storage root if it does not exist.
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.root)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage root '{}': {}",
                        config.storage.root.display(),
                        e
                    ),
                ))
            })?;

        let transport = Transport::new(&config.fetch)?;
        let resolvers = ResolverChain::standard(&config.resolvers, transport.client().clone());
        let extractor = extractor_from_config(&config.video);

        info!(
            root = ?config.storage.root,
            resolvers = ?resolvers,
            video_extractor = extractor.name(),
            "saver initialized"
        );

        Ok(Self::with_components(config, resolvers, transport, extractor))
    }

    /// Assemble a saver from explicit parts
    ///
    /// Does not touch the filesystem. Useful for custom resolver chains.
    pub fn with_components(
        config: Config,
        resolvers: ResolverChain,
        transport: Transport,
        extractor: Arc<dyn VideoExtractor>,
    ) -> Self {
        let locations =
            LocationResolver::new(config.storage.root.clone(), config.storage.filename_rules);
        Self {
            config: Arc::new(config),
            locations,
            resolvers,
            transport,
            extractor,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Location resolver in use
    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    /// Resolver chain in use
    pub fn resolvers(&self) -> &ResolverChain {
        &self.resolvers
    }

    /// Why `post` is not saved under `view`, or `None` if it is accepted
    pub fn skip_reason(&self, post: &Post, view: ViewKind) -> Option<&'static str> {
        let filters = &self.config.filters;
        let policy = self.config.policy(view);

        if filters.skip_sticky && post.is_sticky {
            return Some("sticky");
        }
        if filters.skip_text_only && post.is_text_only {
            return Some("text only");
        }
        if !policy.include_nsfw && post.is_nsfw {
            return Some("nsfw");
        }
        if let Some(min_score) = policy.min_score
            && post.score < min_score
        {
            return Some("below minimum score");
        }
        None
    }

    /// Save one post under `view`
    ///
    /// View filters are not applied here; see [`Saver::save_feed`].
    pub async fn save_post(
        &self,
        post: &Post,
        view: ViewKind,
        cancel: &CancellationToken,
    ) -> SaveOutcome {
        let url = match Url::parse(&post.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(post_id = %post.id, url = %post.url, error = %e, "malformed post url");
                return SaveOutcome::failure_with(format!("malformed url {:?}", post.url), e);
            }
        };

        let outcome = self.save_url(Metadata::from(post), url, view, cancel).await;

        match &outcome {
            SaveOutcome::Saved { path, bytes } => {
                info!(post_id = %post.id, path = ?path, bytes, "saved");
            }
            SaveOutcome::Failure(failure) => {
                warn!(post_id = %post.id, url = %post.url, error = %failure.detail(), "save failed");
            }
            SaveOutcome::Corrupted(failure) => {
                error!(
                    post_id = %post.id,
                    url = %post.url,
                    error = %failure.detail(),
                    "save left inconsistent state on disk"
                );
            }
            other => debug!(post_id = %post.id, outcome = other.label(), "not saved"),
        }

        outcome
    }

    /// Save whatever `url` resolves to, described by `metadata`
    pub async fn save_url(
        &self,
        metadata: Metadata,
        url: Url,
        view: ViewKind,
        cancel: &CancellationToken,
    ) -> SaveOutcome {
        let location = self.locations.resolve_top(&metadata, view);

        if probe::is_saved(&location).await {
            debug!(post_id = %metadata.id, primary = ?location.primary, "already saved");
            return SaveOutcome::AlreadySaved;
        }

        let mut created = links::Created::default();
        self.resolve_and_save(&metadata, url, &location, 0, &mut created, cancel)
            .await
    }

    /// Save every accepted post of a feed, in input order
    ///
    /// Filtered posts are dropped from the result. Up to
    /// `fetch.max_concurrent_items` posts are in flight at once. Once `cancel`
    /// fires no new post is started, so the result may be shorter than the input.
    pub async fn save_feed(
        &self,
        posts: Vec<Post>,
        view: ViewKind,
        cancel: &CancellationToken,
    ) -> Vec<(Post, SaveOutcome)> {
        let accepted: Vec<Post> = posts
            .into_iter()
            .filter(|post| match self.skip_reason(post, view) {
                Some(reason) => {
                    debug!(post_id = %post.id, reason, "post filtered");
                    false
                }
                None => true,
            })
            .collect();

        let concurrency = self.config.fetch.max_concurrent_items.max(1);

        futures::stream::iter(accepted)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|post| async move {
                let outcome = self.save_post(&post, view, cancel).await;
                (post, outcome)
            })
            .buffered(concurrency)
            .collect()
            .await
    }
}
