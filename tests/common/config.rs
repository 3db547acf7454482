//! Test configuration helpers for building savers over a temporary archive

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use feed_archiver::transport::Transport;
use feed_archiver::utils::append_extension;
use feed_archiver::{
    Config, Media, MediaResolver, Metadata, ResolveResult, ResolverChain, Saver, VideoDownload,
    VideoExtractor,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A saver writing into its own temporary storage root
pub struct TestArchive {
    /// Keeps the storage root alive
    pub dir: TempDir,
    pub saver: Saver,
}

impl TestArchive {
    /// Storage root of the archive
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `<root>/<parts...>`
    pub fn path(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(self.root().to_path_buf(), |p, part| p.join(part))
    }
}

/// Default configuration rooted at `root`
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.root = root.to_path_buf();
    config
}

/// Builder for a [`TestArchive`]
pub struct ArchiveBuilder {
    dir: TempDir,
    config: Config,
    extra: Vec<Arc<dyn MediaResolver>>,
    extractor: Arc<dyn VideoExtractor>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(dir.path());
        Self {
            dir,
            config,
            extra: Vec::new(),
            extractor: Arc::new(FakeVideoExtractor::serving(b"fake video")),
        }
    }

    /// Adjust the configuration
    pub fn configure(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    /// Put `resolver` in front of the standard chain
    pub fn resolver(mut self, resolver: impl MediaResolver + 'static) -> Self {
        self.extra.push(Arc::new(resolver));
        self
    }

    pub fn extractor(mut self, extractor: impl VideoExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn build(self) -> TestArchive {
        let transport = Transport::new(&self.config.fetch).expect("Failed to build transport");
        let mut chain = ResolverChain::standard(&self.config.resolvers, transport.client().clone());
        for (index, resolver) in self.extra.into_iter().enumerate() {
            chain.insert(index, resolver);
        }
        TestArchive {
            dir: self.dir,
            saver: Saver::with_components(self.config, chain, transport, self.extractor),
        }
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves `https://album.test/<anything>` to an album of fixed child URLs
pub struct FixedAlbum {
    children: Vec<(String, Url)>,
}

impl FixedAlbum {
    /// Children as `(id, url)` pairs, in album order
    pub fn new<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = (S, String)>,
        S: Into<String>,
    {
        Self {
            children: children
                .into_iter()
                .map(|(id, url)| (id.into(), Url::parse(&url).expect("valid child url")))
                .collect(),
        }
    }
}

#[async_trait]
impl MediaResolver for FixedAlbum {
    fn name(&self) -> &'static str {
        "fixed-album"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("album.test")
    }

    async fn resolve(&self, metadata: &Metadata, _url: &Url) -> ResolveResult {
        let children = self
            .children
            .iter()
            .enumerate()
            .map(|(index, (id, url))| {
                Media::file(Metadata::child(id.clone(), None, index as u32 + 1), url.clone())
            })
            .collect();
        ResolveResult::Success(Media::Album {
            metadata: metadata.clone(),
            children,
        })
    }
}

/// Resolves `https://file.test/<anything>` to one file with fixed candidate URLs
pub struct FixedFile {
    urls: Vec<Url>,
}

impl FixedFile {
    pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            urls: urls
                .into_iter()
                .map(|url| Url::parse(&url).expect("valid candidate url"))
                .collect(),
        }
    }
}

#[async_trait]
impl MediaResolver for FixedFile {
    fn name(&self) -> &'static str {
        "fixed-file"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("file.test")
    }

    async fn resolve(&self, metadata: &Metadata, _url: &Url) -> ResolveResult {
        ResolveResult::Success(Media::File {
            metadata: metadata.clone(),
            urls: self.urls.clone(),
        })
    }
}

/// Video extractor that writes a fixed body as `.mp4`, fails, or reports the
/// video unavailable
pub enum FakeVideoExtractor {
    Serving(Vec<u8>),
    Unavailable,
    Broken,
}

impl FakeVideoExtractor {
    pub fn serving(body: &[u8]) -> Self {
        FakeVideoExtractor::Serving(body.to_vec())
    }
}

#[async_trait]
impl VideoExtractor for FakeVideoExtractor {
    async fn download(
        &self,
        _url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> feed_archiver::Result<VideoDownload> {
        if cancel.is_cancelled() {
            return Err(feed_archiver::Error::Cancelled);
        }
        match self {
            FakeVideoExtractor::Serving(body) => {
                tokio::fs::write(append_extension(destination, "mp4"), body).await?;
                Ok(VideoDownload::Saved {
                    extension: "mp4".to_string(),
                    bytes: body.len() as u64,
                })
            }
            FakeVideoExtractor::Unavailable => Ok(VideoDownload::Unavailable),
            FakeVideoExtractor::Broken => Err(feed_archiver::Error::ExternalTool(
                "extractor exited with status 1".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "fake-video"
    }
}
