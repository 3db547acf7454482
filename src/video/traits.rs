//! Traits and types for video extraction

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of a video download
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoDownload {
    /// The video was written to `<destination>.<extension>`
    Saved {
        /// Container extension chosen by the extractor, without the dot
        extension: String,
        /// Size of the written file
        bytes: u64,
    },
    /// The host reports the video as removed, private or missing
    Unavailable,
}

/// Trait for external video extraction
///
/// The extractor is a black box: it receives a page URL and a destination
/// prefix, and either leaves one completed file at `<prefix>.<ext>` or fails.
///
/// # Examples
///
/// ```no_run
/// use feed_archiver::video::{CliVideoExtractor, VideoDownload, VideoExtractor};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = CliVideoExtractor::from_path().expect("yt-dlp not found");
///
/// let url = Url::parse("https://youtu.be/dQw4w9WgXcQ")?;
/// let prefix = Path::new("archive/saved/all/2009-10-25 - abc - video");
/// match extractor.download(&url, prefix, &CancellationToken::new()).await? {
///     VideoDownload::Saved { extension, bytes } => println!("{bytes} bytes as .{extension}"),
///     VideoDownload::Unavailable => println!("video is gone"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait VideoExtractor: Send + Sync {
    /// Download the video behind `url` to `<destination>.<ext>`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The external binary cannot be executed or exits with an unexpected failure
    /// - Its output cannot be parsed
    /// - `cancel` fires, in which case the process is killed ([`crate::Error::Cancelled`])
    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> crate::Result<VideoDownload>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
