//! Download transport: one HTTP GET, classified, streamed to disk
//!
//! The transport never follows redirects itself; a 3xx is reported back so the
//! saver can run the new location through the resolver chain again. Bodies are
//! written to `<destination>.<ext>` opened in create-new mode, and any failure
//! while streaming removes the partial file before the error is returned.

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{DownloadError, Error, Result};
use crate::utils::{append_extension, remove_file_if_exists};

/// Content types the transport accepts, with the extension each is saved under
///
/// Any other `image/*` type is saved as `jpg`.
pub const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

/// Container formats the video extractor may produce in addition to the table above
pub const VIDEO_CONTAINER_EXTENSIONS: &[&str] = &[
    "mkv", "mov", "m4v", "flv", "avi", "3gp", "ts", "ogv", "m4a", "mp3", "ogg", "opus",
];

/// Every extension a saved artifact can carry, in probe order
pub fn known_extensions() -> impl Iterator<Item = &'static str> {
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .map(|(_, ext)| *ext)
        .chain(VIDEO_CONTAINER_EXTENSIONS.iter().copied())
}

/// Map a `Content-Type` header value to a file extension
///
/// Parameters after `;` are ignored and the comparison is case-insensitive.
pub fn extension_for_content_type(value: &str) -> Option<&'static str> {
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(content_type, _)| *content_type == essence)
        .map(|(_, ext)| *ext)
        .or_else(|| essence.starts_with("image/").then_some("jpg"))
}

/// Classified result of one fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body written to `<destination>.<extension>`
    Saved {
        /// Extension derived from the content type
        extension: &'static str,
        /// Bytes written
        bytes: u64,
    },
    /// 404 or 410
    NotFound,
    /// 3xx with a `Location`, resolved against the request URL
    Redirect(Url),
    /// 2xx whose content type is not in the table
    UnknownContentType(Option<String>),
    /// Any other status, including 3xx without a `Location`
    UnexpectedStatus(u16),
}

/// HTTP transport for media downloads
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// Build a transport from fetch settings
    ///
    /// Redirect following is disabled; timeouts and user agent come from `config`.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = build_client(config)?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    ///
    /// The client must not follow redirects, otherwise redirects never reach the
    /// resolver chain.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Underlying HTTP client, shared with host adapters
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch `url` and, on success, stream the body to `<destination>.<ext>`
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` fires before or during the transfer
    /// - [`Error::Io`] with kind `AlreadyExists` if the target file is present
    /// - [`Error::Network`] / [`Error::Io`] for transfer failures; the partial
    ///   file is removed first
    pub async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.client.get(url.clone()).send() => response?,
        };

        let status = response.status();
        debug!(%url, status = status.as_u16(), "fetched");

        if status.is_redirection() {
            return match response.headers().get(LOCATION) {
                Some(location) => Ok(FetchOutcome::Redirect(resolve_location(url, location)?)),
                None => Ok(FetchOutcome::UnexpectedStatus(status.as_u16())),
            };
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Ok(FetchOutcome::UnexpectedStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let Some(extension) = content_type.as_deref().and_then(extension_for_content_type) else {
            return Ok(FetchOutcome::UnknownContentType(content_type));
        };

        let path = append_extension(destination, extension);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        match stream_body(response, &mut file, cancel).await {
            Ok(bytes) => {
                debug!(%url, ?path, bytes, "body written");
                Ok(FetchOutcome::Saved { extension, bytes })
            }
            Err(e) => {
                drop(file);
                if let Err(cleanup) = remove_file_if_exists(&path).await {
                    warn!(?path, error = %cleanup, "unable to remove partial download");
                }
                Err(e)
            }
        }
    }
}

/// Build the download client: no redirects, bounded timeouts
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(Error::from)
}

fn resolve_location(base: &Url, location: &reqwest::header::HeaderValue) -> Result<Url> {
    let raw = location.to_str().map_err(|e| DownloadError::MalformedRedirect {
        location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
        reason: e.to_string(),
    })?;

    base.join(raw).map_err(|e| {
        DownloadError::MalformedRedirect {
            location: raw.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

async fn stream_body(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
