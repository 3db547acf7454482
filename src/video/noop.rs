//! No-op extractor used when no video tool is installed

use super::traits::{VideoDownload, VideoExtractor};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// No-op extractor used when video support is unavailable
///
/// Every download fails with `Error::ExternalTool`, so video posts are reported
/// as failures and retried on the next run once a tool is installed.
///
/// # Examples
///
/// ```
/// use feed_archiver::video::{NoOpVideoExtractor, VideoExtractor};
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = NoOpVideoExtractor;
/// let url = Url::parse("https://youtu.be/abc")?;
/// let result = extractor
///     .download(&url, Path::new("video"), &CancellationToken::new())
///     .await;
/// assert!(result.is_err());
/// # Ok(())
/// # }
/// ```
pub struct NoOpVideoExtractor;

#[async_trait]
impl VideoExtractor for NoOpVideoExtractor {
    async fn download(
        &self,
        _url: &Url,
        _destination: &Path,
        _cancel: &CancellationToken,
    ) -> crate::Result<VideoDownload> {
        Err(crate::Error::ExternalTool(
            "video downloads require yt-dlp or youtube-dl. \
             Configure video.binary_path or ensure one is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
