//! CLI-based extractor using an external yt-dlp or youtube-dl binary

use super::traits::{VideoDownload, VideoExtractor};
use crate::config::VideoConfig;
use crate::transport::known_extensions;
use crate::utils::append_extension;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Binary names tried by [`CliVideoExtractor::from_path`]
pub const DEFAULT_BINARY_NAMES: &[&str] = &["yt-dlp", "youtube-dl"];

/// Phrases in the tool's error output that mean the video is gone for good
const UNAVAILABLE_MARKERS: &[&str] = &[
    "video unavailable",
    "this video is unavailable",
    "has been removed",
    "private video",
    "does not exist",
    "http error 404",
    "http error 410",
];

/// Line printed by `--print-json`; only the fields this crate reads
#[derive(Debug, Deserialize)]
struct PrintedInfo {
    ext: String,
}

/// CLI-based video extractor using an external yt-dlp compatible binary
///
/// Runs `<binary> <url> --output "<prefix>.%(ext)s" --print-json --no-mtime`
/// and reads the chosen extension from the printed JSON.
///
/// # Examples
///
/// ```no_run
/// use feed_archiver::video::CliVideoExtractor;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let extractor = CliVideoExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let extractor = CliVideoExtractor::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct CliVideoExtractor {
    binary_path: PathBuf,
    extra_args: Vec<String>,
}

impl CliVideoExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            extra_args: Vec::new(),
        }
    }

    /// Arguments passed before the URL on every invocation
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Attempt to find yt-dlp, then youtube-dl, in PATH
    pub fn from_path() -> Option<Self> {
        Self::search(DEFAULT_BINARY_NAMES)
    }

    /// First of `names` found in PATH
    pub fn search<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        names
            .iter()
            .find_map(|name| which::which(name.as_ref()).ok())
            .map(Self::new)
    }

    /// Build from configuration: explicit path first, then a PATH search if allowed
    pub fn from_config(config: &VideoConfig) -> Option<Self> {
        let extractor = match &config.binary_path {
            Some(path) => Some(Self::new(path.clone())),
            None if config.search_path => Self::search(&config.binary_names),
            None => None,
        };
        extractor.map(|e| e.with_extra_args(config.extra_args.clone()))
    }

    /// Path of the binary this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

/// Output template for `destination`: `%` escaped, `.%(ext)s` appended
pub fn output_template(destination: &Path) -> crate::Result<String> {
    let prefix = destination.to_str().ok_or_else(|| {
        crate::Error::ExternalTool(format!(
            "destination is not valid UTF-8: {}",
            destination.display()
        ))
    })?;
    Ok(format!("{}.%(ext)s", prefix.replace('%', "%%")))
}

/// Whether the tool's stderr says the video is permanently unavailable
fn is_unavailable(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    UNAVAILABLE_MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Extension from the last JSON line of `--print-json` output
fn parse_printed_extension(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| serde_json::from_str::<PrintedInfo>(line.trim()).ok())
        .map(|info| info.ext)
        .filter(|ext| !ext.is_empty())
}

/// Remove anything the tool left at `<destination>.*` (partial downloads, fragments)
async fn remove_partial_outputs(destination: &Path) {
    let (Some(parent), Some(name)) = (
        destination.parent(),
        destination.file_name().and_then(|n| n.to_str()),
    ) else {
        return;
    };
    let prefix = format!("{name}.");

    let Ok(mut entries) = tokio::fs::read_dir(parent).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(&prefix) {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            warn!(path = ?entry.path(), error = %e, "unable to remove partial video output");
        }
    }
}

#[async_trait]
impl VideoExtractor for CliVideoExtractor {
    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> crate::Result<VideoDownload> {
        let template = output_template(destination)?;

        let child = Command::new(&self.binary_path)
            .args(&self.extra_args)
            .arg(url.as_str())
            .arg("--output")
            .arg(&template)
            .arg("--print-json")
            .arg("--no-mtime")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                crate::Error::ExternalTool(format!(
                    "Failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        debug!(%url, binary = ?self.binary_path, %template, "video extractor started");

        // the child is killed when its future is dropped
        let output = tokio::select! {
            _ = cancel.cancelled() => None,
            output = child.wait_with_output() => Some(output),
        };
        let Some(output) = output else {
            remove_partial_outputs(destination).await;
            return Err(crate::Error::Cancelled);
        };
        let output = output.map_err(|e| {
            crate::Error::ExternalTool(format!("Failed to wait for video extractor: {}", e))
        })?;

        if !output.status.success() {
            remove_partial_outputs(destination).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_unavailable(&stderr) {
                debug!(%url, "video reported unavailable");
                return Ok(VideoDownload::Unavailable);
            }
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no error output");
            return Err(crate::Error::ExternalTool(format!(
                "video extractor exited with {}: {}",
                output.status,
                reason.trim()
            )));
        }

        let extension = parse_printed_extension(&output.stdout).ok_or_else(|| {
            crate::Error::ExternalTool("video extractor printed no usable metadata".into())
        })?;

        // outputs must carry an extension the saved-probe looks for
        if !known_extensions().any(|known| known == extension) {
            remove_partial_outputs(destination).await;
            return Err(crate::Error::ExternalTool(format!(
                "video extractor produced unsupported extension '{extension}'"
            )));
        }

        let path = append_extension(destination, &extension);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            crate::Error::ExternalTool(format!(
                "video extractor reported {} but it cannot be read: {}",
                path.display(),
                e
            ))
        })?;

        Ok(VideoDownload::Saved {
            extension,
            bytes: metadata.len(),
        })
    }

    fn name(&self) -> &'static str {
        "cli-video"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_template_escapes_percent() {
        let template = output_template(Path::new("saved/all/100% real")).unwrap();
        assert_eq!(template, "saved/all/100%% real.%(ext)s");
    }

    #[test]
    fn test_unavailable_markers() {
        assert!(is_unavailable("ERROR: [youtube] abc: Video unavailable"));
        assert!(is_unavailable("ERROR: Private video. Sign in if you've been granted access"));
        assert!(is_unavailable("ERROR: unable to download video data: HTTP Error 404: Not Found"));
        assert!(!is_unavailable("ERROR: Unsupported URL: https://example.com"));
    }

    #[test]
    fn test_parse_printed_extension_uses_last_json_line() {
        let stdout = b"[download] 100%\n{\"ext\": \"webm\", \"title\": \"a\"}\n{\"ext\": \"mp4\"}\n\n";
        assert_eq!(parse_printed_extension(stdout).as_deref(), Some("mp4"));
        assert_eq!(parse_printed_extension(b"not json"), None);
        assert_eq!(parse_printed_extension(b"{\"ext\": \"\"}"), None);
    }

    #[test]
    fn test_from_path_consistency_with_which_crate() {
        let expected = DEFAULT_BINARY_NAMES
            .iter()
            .find_map(|name| which::which(name).ok());
        let found = CliVideoExtractor::from_path();

        assert_eq!(
            expected,
            found.map(|e| e.binary_path),
            "from_path() should pick the first binary which::which() finds"
        );
    }

    #[test]
    fn test_from_config_prefers_explicit_path() {
        let config = VideoConfig {
            binary_path: Some(PathBuf::from("/opt/tools/yt-dlp")),
            search_path: false,
            binary_names: vec![],
            extra_args: vec!["--format".into(), "best".into()],
        };
        let extractor = CliVideoExtractor::from_config(&config).unwrap();
        assert_eq!(extractor.binary_path(), Path::new("/opt/tools/yt-dlp"));
        assert_eq!(extractor.extra_args, vec!["--format", "best"]);

        let config = VideoConfig {
            binary_path: None,
            search_path: false,
            ..VideoConfig::default()
        };
        assert!(CliVideoExtractor::from_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_external_tool_error() {
        let extractor = CliVideoExtractor::new(PathBuf::from("/nonexistent/yt-dlp-xyz"));
        let url = Url::parse("https://youtu.be/abc").unwrap();
        let result = extractor
            .download(&url, Path::new("/tmp/x"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(crate::Error::ExternalTool(_))));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::time::Duration;
        use tempfile::TempDir;

        /// Extractor that runs `script` through `/bin/sh`; the script sees the
        /// usual arguments as `$1..`
        fn scripted(dir: &TempDir, script: &str) -> CliVideoExtractor {
            let path = dir.path().join("fake-ytdl.sh");
            std::fs::write(&path, script).unwrap();
            CliVideoExtractor::new(PathBuf::from("/bin/sh"))
                .with_extra_args(vec![path.to_string_lossy().into_owned()])
        }

        const RESOLVE_OUTPUT: &str =
            "out=$(printf '%s' \"$3\" | sed -e 's/%(ext)s/mp4/' -e 's/%%/%/g')\n";

        fn url() -> Url {
            Url::parse("https://youtu.be/abc").unwrap()
        }

        #[tokio::test]
        async fn test_successful_download_reports_extension_and_size() {
            let dir = TempDir::new().unwrap();
            let script = format!(
                "{RESOLVE_OUTPUT}printf 'video-bytes' > \"$out\"\necho '{{\"ext\": \"mp4\"}}'\n"
            );
            let extractor = scripted(&dir, &script);
            let destination = dir.path().join("100% clip");

            let result = extractor
                .download(&url(), &destination, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(
                result,
                VideoDownload::Saved {
                    extension: "mp4".into(),
                    bytes: 11
                }
            );
            assert!(dir.path().join("100% clip.mp4").exists());
        }

        #[tokio::test]
        async fn test_unknown_extension_is_rejected_and_removed() {
            let dir = TempDir::new().unwrap();
            let script = "out=$(printf '%s' \"$3\" | sed -e 's/%(ext)s/xyz/' -e 's/%%/%/g')\n\
                          printf 'video-bytes' > \"$out\"\necho '{\"ext\": \"xyz\"}'\n";
            let extractor = scripted(&dir, script);

            let err = extractor
                .download(&url(), &dir.path().join("clip"), &CancellationToken::new())
                .await
                .unwrap_err();

            match err {
                crate::Error::ExternalTool(msg) => assert!(msg.contains("'xyz'"), "{msg}"),
                other => panic!("expected ExternalTool, got {other:?}"),
            }
            assert!(!dir.path().join("clip.xyz").exists());
        }

        #[tokio::test]
        async fn test_unavailable_video() {
            let dir = TempDir::new().unwrap();
            let extractor = scripted(
                &dir,
                "echo 'ERROR: [youtube] abc: Video unavailable' >&2\nexit 1\n",
            );

            let result = extractor
                .download(&url(), &dir.path().join("clip"), &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(result, VideoDownload::Unavailable);
        }

        #[tokio::test]
        async fn test_failure_removes_partial_output() {
            let dir = TempDir::new().unwrap();
            let script = format!(
                "{RESOLVE_OUTPUT}printf 'half' > \"$out.part\"\n\
                 echo 'ERROR: unable to extract player response' >&2\nexit 1\n"
            );
            let extractor = scripted(&dir, &script);

            let err = extractor
                .download(&url(), &dir.path().join("clip"), &CancellationToken::new())
                .await
                .unwrap_err();

            match err {
                crate::Error::ExternalTool(msg) => {
                    assert!(msg.contains("unable to extract player response"), "{msg}")
                }
                other => panic!("expected ExternalTool, got {other:?}"),
            }
            assert!(!dir.path().join("clip.mp4.part").exists());
            assert!(dir.path().join("fake-ytdl.sh").exists(), "unrelated files stay");
        }

        #[tokio::test]
        async fn test_cancellation_kills_extractor() {
            let dir = TempDir::new().unwrap();
            let extractor = scripted(&dir, "sleep 10\n");

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.cancel();
            });

            let started = std::time::Instant::now();
            let result = extractor
                .download(&url(), &dir.path().join("clip"), &cancel)
                .await;

            assert!(matches!(result, Err(crate::Error::Cancelled)));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
