//! Recursive saving of resolved media
//!
//! Redirects re-enter the resolver chain at the same location, and albums save
//! their children through the same path, so these functions return boxed
//! futures.

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use super::links::{self, Created};
use super::{Saver, probe};
use crate::error::{DownloadError, Error, SaveFailure};
use crate::location::LocalLocation;
use crate::media::{Media, Metadata};
use crate::resolver::{Dispatch, ResolveResult};
use crate::transport::FetchOutcome;
use crate::types::SaveOutcome;
use crate::utils::create_parent_dir;
use crate::video::VideoDownload;

impl Saver {
    /// Dispatch `url` to the chain and save the result at `location`
    ///
    /// `hops` counts redirects already followed for this location. Every path
    /// written is recorded in `created`.
    pub(crate) fn resolve_and_save<'a>(
        &'a self,
        metadata: &'a Metadata,
        url: Url,
        location: &'a LocalLocation,
        hops: usize,
        created: &'a mut Created,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SaveOutcome> {
        async move {
            match self.resolvers.dispatch(metadata, &url).await {
                Dispatch::NotMatched => SaveOutcome::NotMatched,
                Dispatch::Resolved { resolver, result } => match result {
                    ResolveResult::Success(media) => {
                        debug!(post_id = %metadata.id, resolver, kind = media.kind(), "resolved");
                        self.save_media(media, location, hops, created, cancel).await
                    }
                    ResolveResult::Ignored => SaveOutcome::Ignored,
                    ResolveResult::NotFound => SaveOutcome::NotFound,
                    ResolveResult::Error(e) => {
                        warn!(post_id = %metadata.id, resolver, %url, error = %e, "resolver failed");
                        SaveOutcome::Failure(e.into())
                    }
                },
            }
        }
        .boxed()
    }

    pub(crate) fn save_media<'a>(
        &'a self,
        media: Media,
        location: &'a LocalLocation,
        hops: usize,
        created: &'a mut Created,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SaveOutcome> {
        async move {
            match media {
                Media::File { metadata, urls } => {
                    self.save_file(&metadata, urls, location, hops, created, cancel)
                        .await
                }
                Media::Album { metadata, children } => {
                    self.save_album(&metadata, children, location, hops, created, cancel)
                        .await
                }
                Media::Video { metadata, url } => {
                    self.save_video(&metadata, &url, location, created, cancel)
                        .await
                }
            }
        }
        .boxed()
    }

    async fn save_file(
        &self,
        metadata: &Metadata,
        urls: Vec<Url>,
        location: &LocalLocation,
        hops: usize,
        created: &mut Created,
        cancel: &CancellationToken,
    ) -> SaveOutcome {
        if urls.is_empty() {
            return pipeline_failure(DownloadError::NoUrls {
                id: metadata.id.clone(),
            });
        }

        if let Err(e) = create_parent_dir(&location.primary).await {
            return SaveOutcome::failure_with(
                format!("failed to create directory for {}", location.primary.display()),
                e,
            );
        }

        let mut attempts: Vec<(Url, SaveOutcome)> = Vec::with_capacity(urls.len());
        for url in urls {
            let outcome = match self.transport.fetch(&url, &location.primary, cancel).await {
                Ok(FetchOutcome::Saved { extension, bytes }) => {
                    return links::fan_out(location, extension, bytes, created).await;
                }
                Ok(FetchOutcome::NotFound) => SaveOutcome::NotFound,
                Ok(FetchOutcome::Redirect(next)) => {
                    let limit = self.config.fetch.max_redirects;
                    if hops >= limit {
                        pipeline_failure(DownloadError::RedirectLimit {
                            limit,
                            url: next.to_string(),
                        })
                    } else {
                        debug!(post_id = %metadata.id, from = %url, to = %next, hops, "following redirect");
                        match self
                            .resolve_and_save(metadata, next, location, hops + 1, created, cancel)
                            .await
                        {
                            saved @ SaveOutcome::Saved { .. } => return saved,
                            other => other,
                        }
                    }
                }
                Ok(FetchOutcome::UnknownContentType(content_type)) => {
                    pipeline_failure(DownloadError::UnknownContentType {
                        url: url.to_string(),
                        content_type,
                    })
                }
                Ok(FetchOutcome::UnexpectedStatus(status)) => {
                    pipeline_failure(DownloadError::UnexpectedStatus {
                        url: url.to_string(),
                        status,
                    })
                }
                Err(Error::Cancelled) => {
                    return SaveOutcome::failure_with(
                        format!("cancelled while fetching {url}"),
                        Error::Cancelled,
                    );
                }
                Err(e) => SaveOutcome::failure_with(format!("failed to fetch {url}"), e),
            };

            if outcome.is_failure() {
                warn!(post_id = %metadata.id, %url, error = %outcome, "attempt failed");
            }
            attempts.push((url, outcome));
        }

        if attempts.len() == 1
            && let Some((_, outcome)) = attempts.pop()
        {
            return outcome;
        }
        if attempts
            .iter()
            .all(|(_, outcome)| matches!(outcome, SaveOutcome::NotFound))
        {
            return SaveOutcome::NotFound;
        }

        pipeline_failure(DownloadError::AllUrlsFailed {
            attempts: attempts
                .iter()
                .map(|(url, outcome)| format!("{url}: {outcome}"))
                .collect(),
        })
    }

    async fn save_album(
        &self,
        metadata: &Metadata,
        mut children: Vec<Media>,
        location: &LocalLocation,
        hops: usize,
        created: &mut Created,
        cancel: &CancellationToken,
    ) -> SaveOutcome {
        if children.is_empty() {
            return SaveOutcome::NotFound;
        }

        if self.config.albums.collapse_singletons
            && children.len() == 1
            && matches!(children.first(), Some(Media::File { .. }))
            && let Some(Media::File { urls, .. }) = children.pop()
        {
            debug!(post_id = %metadata.id, "collapsing single-item album");
            return self
                .save_file(metadata, urls, location, hops, created, cancel)
                .await;
        }

        // secondaries that already exist belong to another view
        let mut album = Created::default();
        for secondary in &location.secondaries {
            if !tokio::fs::try_exists(secondary).await.unwrap_or(true) {
                album.dir(secondary.clone());
            }
        }

        if let Err(e) = tokio::fs::create_dir_all(&location.primary).await {
            return SaveOutcome::failure_with(
                format!("failed to create album directory {}", location.primary.display()),
                e,
            );
        }
        album.dir(location.primary.clone());

        let mut bytes = 0;
        for child in children {
            let child_location = self.locations.resolve_child(child.metadata(), location);
            let child_id = child.metadata().id.clone();

            if probe::is_saved(&child_location).await {
                warn!(album = %metadata.id, child = %child_id, "album child already saved, skipping");
                continue;
            }

            match self
                .save_media(child, &child_location, 0, &mut album, cancel)
                .await
            {
                SaveOutcome::Saved { bytes: written, .. } => bytes += written,
                SaveOutcome::Failure(failure) | SaveOutcome::Corrupted(failure) => {
                    return rollback_album(metadata, &child_id, location, album, failure).await;
                }
                other => {
                    warn!(album = %metadata.id, child = %child_id, outcome = other.label(), "album child skipped");
                }
            }
        }

        created.absorb(album);
        SaveOutcome::Saved {
            path: location.primary.clone(),
            bytes,
        }
    }

    async fn save_video(
        &self,
        metadata: &Metadata,
        url: &Url,
        location: &LocalLocation,
        created: &mut Created,
        cancel: &CancellationToken,
    ) -> SaveOutcome {
        if let Err(e) = create_parent_dir(&location.primary).await {
            return SaveOutcome::failure_with(
                format!("failed to create directory for {}", location.primary.display()),
                e,
            );
        }

        match self
            .extractor
            .download(url, &location.primary, cancel)
            .await
        {
            Ok(VideoDownload::Saved { extension, bytes }) => {
                links::fan_out(location, &extension, bytes, created).await
            }
            Ok(VideoDownload::Unavailable) => {
                debug!(post_id = %metadata.id, %url, "video unavailable");
                SaveOutcome::NotFound
            }
            Err(e) => SaveOutcome::failure_with(
                format!("{} failed to download {url}", self.extractor.name()),
                e,
            ),
        }
    }
}

fn pipeline_failure(error: DownloadError) -> SaveOutcome {
    SaveOutcome::Failure(SaveFailure::new(error.to_string()))
}

/// Undo what the album call wrote, leaving directories and links that existed
/// before it untouched
async fn rollback_album(
    metadata: &Metadata,
    child: &str,
    location: &LocalLocation,
    created: Created,
    failure: SaveFailure,
) -> SaveOutcome {
    let reason = DownloadError::AlbumChildFailed {
        album: location.primary.clone(),
        child: child.to_string(),
    };
    let failure = SaveFailure {
        message: format!("{}: {}", reason, failure.message),
        cause: failure.cause,
    };

    let leftovers = created.undo().await;

    if leftovers.is_empty() {
        debug!(album = %metadata.id, primary = ?location.primary, "album rolled back");
        return SaveOutcome::Failure(failure);
    }

    error!(
        album = %metadata.id,
        leftovers = %leftovers.join("; "),
        "album rollback did not complete"
    );
    SaveOutcome::Corrupted(SaveFailure {
        message: format!(
            "{}; cleanup failed for {}",
            failure.message,
            leftovers.join("; ")
        ),
        cause: failure.cause,
    })
}
