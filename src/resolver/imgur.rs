//! Imgur image and album pages, resolved through the Imgur API

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::traits::{MediaResolver, ResolveError, ResolveResult, path_segments, registrable_domain};
use crate::media::{Media, Metadata};

#[allow(clippy::expect_used)]
static HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(\.gifv)?$").expect("valid static pattern"));

fn is_imgur(url: &Url) -> bool {
    registrable_domain(url).as_deref() == Some("imgur.com")
}

fn strip_suffix(hash: &str) -> &str {
    hash.split('.').next().unwrap_or(hash)
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ImageModel {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    mp4: Option<String>,
    gifv: Option<String>,
    link: Option<String>,
}

impl ImageModel {
    /// Candidate URLs in preference order; blank or unparseable entries dropped
    fn urls(&self) -> Vec<Url> {
        [&self.mp4, &self.gifv, &self.link]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| Url::parse(s).ok())
            .collect()
    }

    fn caption(&self) -> Option<String> {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.description.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AlbumModel {
    images: Option<Vec<ImageModel>>,
}

enum ApiResponse<T> {
    Found(Option<T>),
    NotFound,
}

/// Shared Imgur API access
#[derive(Clone, Debug)]
pub struct ImgurApi {
    client: reqwest::Client,
    base: String,
    client_id: Option<String>,
}

impl ImgurApi {
    /// Create API access; requests fail with an error until a client id is set
    pub fn new(
        client: reqwest::Client,
        base: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            client_id: client_id.filter(|id| !id.trim().is_empty()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ResolveError> {
        let Some(client_id) = &self.client_id else {
            return Err(ResolveError::new("imgur client id not configured"));
        };

        let endpoint = format!("{}/{}", self.base, path);
        debug!(%endpoint, "querying imgur");

        let response = self
            .client
            .get(endpoint.as_str())
            .header(reqwest::header::AUTHORIZATION, format!("Client-ID {client_id}"))
            .send()
            .await
            .map_err(|e| {
                ResolveError::with_cause(format!("imgur request to {endpoint} failed"), e)
            })?;

        match response.status().as_u16() {
            200 => {
                let envelope: Envelope<T> = response.json().await.map_err(|e| {
                    ResolveError::with_cause("unable to decode imgur response", e)
                })?;
                Ok(ApiResponse::Found(envelope.data))
            }
            404 => Ok(ApiResponse::NotFound),
            status => Err(ResolveError::new(format!(
                "unexpected imgur status code: {status}"
            ))),
        }
    }
}

/// Single images: `imgur.com/<hash>` and `imgur.com/<hash>.gifv`
#[derive(Clone, Debug)]
pub struct ImgurImage {
    api: ImgurApi,
}

impl ImgurImage {
    /// Resolver backed by `api`
    pub fn new(api: ImgurApi) -> Self {
        Self { api }
    }

    fn hash<'a>(&self, url: &'a Url) -> Option<&'a str> {
        if !is_imgur(url) {
            return None;
        }
        match path_segments(url).as_slice() {
            [hash] | [hash, ""] if HASH.is_match(hash) => Some(strip_suffix(*hash)),
            _ => None,
        }
    }
}

#[async_trait]
impl MediaResolver for ImgurImage {
    fn name(&self) -> &'static str {
        "imgur-image"
    }

    fn matches(&self, url: &Url) -> bool {
        self.hash(url).is_some()
    }

    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
        let Some(hash) = self.hash(url) else {
            return ResolveResult::Error(ResolveError::new(format!("not an imgur image: {url}")));
        };

        match self.api.get::<ImageModel>(&format!("image/{hash}")).await {
            Ok(ApiResponse::Found(Some(image))) => ResolveResult::Success(Media::File {
                metadata: metadata.clone(),
                urls: image.urls(),
            }),
            Ok(ApiResponse::Found(None)) => {
                ResolveResult::Error(ResolveError::new("no data returned by imgur api"))
            }
            Ok(ApiResponse::NotFound) => ResolveResult::NotFound,
            Err(e) => ResolveResult::Error(e),
        }
    }
}

/// Albums: `imgur.com/a/<hash>`
#[derive(Clone, Debug)]
pub struct ImgurAlbum {
    api: ImgurApi,
}

impl ImgurAlbum {
    /// Resolver backed by `api`
    pub fn new(api: ImgurApi) -> Self {
        Self { api }
    }

    fn hash<'a>(&self, url: &'a Url) -> Option<&'a str> {
        if !is_imgur(url) {
            return None;
        }
        match path_segments(url).as_slice() {
            ["a", hash] | ["a", hash, ""] if HASH.is_match(hash) => Some(strip_suffix(*hash)),
            _ => None,
        }
    }
}

#[async_trait]
impl MediaResolver for ImgurAlbum {
    fn name(&self) -> &'static str {
        "imgur-album"
    }

    fn matches(&self, url: &Url) -> bool {
        self.hash(url).is_some()
    }

    async fn resolve(&self, metadata: &Metadata, url: &Url) -> ResolveResult {
        let Some(hash) = self.hash(url) else {
            return ResolveResult::Error(ResolveError::new(format!("not an imgur album: {url}")));
        };

        let images = match self.api.get::<AlbumModel>(&format!("album/{hash}")).await {
            Ok(ApiResponse::Found(Some(AlbumModel { images: Some(images) }))) => images,
            Ok(ApiResponse::Found(_)) => {
                return ResolveResult::Error(ResolveError::new("no data returned by imgur api"));
            }
            Ok(ApiResponse::NotFound) => return ResolveResult::NotFound,
            Err(e) => return ResolveResult::Error(e),
        };

        if images.is_empty() {
            return ResolveResult::NotFound;
        }

        // positions follow the API order, including entries skipped for lacking an id
        let children = images
            .iter()
            .enumerate()
            .filter_map(|(index, image)| {
                let id = image.id.as_deref().filter(|id| !id.trim().is_empty())?;
                let position = u32::try_from(index + 1).ok()?;
                Some(Media::File {
                    metadata: Metadata::child(id, image.caption(), position),
                    urls: image.urls(),
                })
            })
            .collect();

        ResolveResult::Success(Media::Album {
            metadata: metadata.clone(),
            children,
        })
    }
}
