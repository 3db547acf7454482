//! Configuration types for feed-archiver

use crate::error::{Error, Result};
use crate::location::FilenameRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage layout settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Archive root directory (default: "./archive")
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Which characters are replaced in filenames (default: platform dependent)
    #[serde(default)]
    pub filename_rules: FilenameRules,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            filename_rules: FilenameRules::default(),
        }
    }
}

/// HTTP fetch behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// TCP connect timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Overall request timeout, including the body (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Maximum redirects followed for one file before giving up (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Feed items saved concurrently (default: 1)
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

/// Album handling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlbumConfig {
    /// Save a single-file album as a plain file at the album's location (default: true)
    #[serde(default = "default_true")]
    pub collapse_singletons: bool,
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            collapse_singletons: true,
        }
    }
}

/// Per-view acceptance thresholds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPolicy {
    /// Skip posts scoring below this (None = no threshold)
    #[serde(default)]
    pub min_score: Option<i64>,

    /// Save posts marked NSFW (default: true)
    #[serde(default = "default_true")]
    pub include_nsfw: bool,
}

impl Default for ViewPolicy {
    fn default() -> Self {
        Self {
            min_score: None,
            include_nsfw: true,
        }
    }
}

/// Feed filters applied before anything touches the disk or network
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Skip posts pinned by moderators (default: true)
    #[serde(default = "default_true")]
    pub skip_sticky: bool,

    /// Skip posts without a link (default: true)
    #[serde(default = "default_true")]
    pub skip_text_only: bool,

    /// Thresholds for the saved-post view
    #[serde(default)]
    pub saved_post: ViewPolicy,

    /// Thresholds for the followed-author view
    #[serde(default)]
    pub followed_author: ViewPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skip_sticky: true,
            skip_text_only: true,
            saved_post: ViewPolicy::default(),
            followed_author: ViewPolicy::default(),
        }
    }
}

/// Host adapter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Domains whose links are never saved; subdomains included
    #[serde(default)]
    pub ignored_domains: Vec<String>,

    /// File with one ignored domain per line (`#` starts a comment)
    #[serde(default)]
    pub ignored_domains_file: Option<PathBuf>,

    /// Imgur API client id (Imgur links fail without it)
    #[serde(default)]
    pub imgur_client_id: Option<String>,

    /// Imgur API base URL (default: "https://api.imgur.com/3")
    #[serde(default = "default_imgur_api_base")]
    pub imgur_api_base: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ignored_domains: Vec::new(),
            ignored_domains_file: None,
            imgur_client_id: None,
            imgur_api_base: default_imgur_api_base(),
        }
    }
}

/// External video extraction tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Path to the extractor executable (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for the extractor if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Executable names tried in order when searching PATH
    #[serde(default = "default_binary_names")]
    pub binary_names: Vec<String>,

    /// Extra arguments passed before the URL (e.g. `["--format", "best"]`)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            binary_names: default_binary_names(),
            extra_args: Vec::new(),
        }
    }
}

/// Main configuration for feed-archiver
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP fetch behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Album handling
    #[serde(default)]
    pub albums: AlbumConfig,

    /// Feed filters
    #[serde(default)]
    pub filters: FilterConfig,

    /// Host adapters
    #[serde(default)]
    pub resolvers: ResolverConfig,

    /// Video extraction tool
    #[serde(default)]
    pub video: VideoConfig,
}

impl Config {
    /// Parse a TOML document without touching the filesystem
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    ///
    /// Merges the ignored-domains file, if one is configured, and validates the result.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("unable to read {}: {}", path.display(), e),
            key: None,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.load_ignored_domains().await?;
        config.validate()?;
        Ok(config)
    }

    /// Merge domains listed in `resolvers.ignored_domains_file` into `resolvers.ignored_domains`
    pub async fn load_ignored_domains(&mut self) -> Result<()> {
        let Some(path) = self.resolvers.ignored_domains_file.clone() else {
            return Ok(());
        };

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| Error::Config {
            message: format!("unable to read {}: {}", path.display(), e),
            key: Some("resolvers.ignored_domains_file".into()),
        })?;

        for line in content.lines() {
            let domain = line.split('#').next().unwrap_or_default().trim();
            if domain.is_empty() {
                continue;
            }
            let domain = domain.to_ascii_lowercase();
            if !self.resolvers.ignored_domains.contains(&domain) {
                self.resolvers.ignored_domains.push(domain);
            }
        }

        Ok(())
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_redirects == 0 {
            return Err(invalid("fetch.max_redirects", "must be at least 1"));
        }
        if self.fetch.max_concurrent_items == 0 {
            return Err(invalid("fetch.max_concurrent_items", "must be at least 1"));
        }
        if self.fetch.connect_timeout.is_zero() {
            return Err(invalid("fetch.connect_timeout", "must be non-zero"));
        }
        if self.fetch.request_timeout.is_zero() {
            return Err(invalid("fetch.request_timeout", "must be non-zero"));
        }
        if let Err(e) = url::Url::parse(&self.resolvers.imgur_api_base) {
            return Err(invalid(
                "resolvers.imgur_api_base",
                &format!("invalid URL: {e}"),
            ));
        }
        Ok(())
    }

    /// The acceptance thresholds of one view
    pub fn policy(&self, view: crate::types::ViewKind) -> &ViewPolicy {
        match view {
            crate::types::ViewKind::SavedPost => &self.filters.saved_post,
            crate::types::ViewKind::FollowedAuthor => &self.filters.followed_author,
        }
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./archive")
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("feed-archiver/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrent_items() -> usize {
    1
}

fn default_imgur_api_base() -> String {
    "https://api.imgur.com/3".to_string()
}

fn default_binary_names() -> Vec<String> {
    vec!["yt-dlp".to_string(), "youtube-dl".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViewKind;
    use tempfile::TempDir;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty config must parse");

        assert_eq!(config.storage.root, PathBuf::from("./archive"));
        assert_eq!(config.fetch.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(300));
        assert_eq!(config.fetch.max_redirects, 10);
        assert_eq!(config.fetch.max_concurrent_items, 1);
        assert!(config.fetch.user_agent.starts_with("feed-archiver/"));
        assert!(config.albums.collapse_singletons);
        assert!(config.filters.skip_sticky);
        assert!(config.filters.skip_text_only);
        assert!(config.filters.saved_post.include_nsfw);
        assert_eq!(config.resolvers.imgur_api_base, "https://api.imgur.com/3");
        assert_eq!(config.video.binary_names, vec!["yt-dlp", "youtube-dl"]);
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn nested_sections_override_defaults() {
        let toml = r#"
            [storage]
            root = "/srv/archive"
            filename_rules = "windows"

            [fetch]
            request_timeout = 60
            max_concurrent_items = 4

            [filters.followed_author]
            min_score = 5
            include_nsfw = false

            [resolvers]
            ignored_domains = ["example.com"]
            imgur_client_id = "abc123"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/srv/archive"));
        assert_eq!(config.storage.filename_rules, FilenameRules::Windows);
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(60));
        assert_eq!(config.fetch.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.max_concurrent_items, 4);
        assert_eq!(
            config.policy(ViewKind::FollowedAuthor),
            &ViewPolicy {
                min_score: Some(5),
                include_nsfw: false
            }
        );
        assert_eq!(config.policy(ViewKind::SavedPost), &ViewPolicy::default());
        assert_eq!(config.resolvers.imgur_client_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[fetch]\nmax_redirects = \"many\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)), "got {err:?}");
    }

    #[test]
    fn validate_rejects_zero_redirects_with_key() {
        let mut config = Config::default();
        config.fetch.max_redirects = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("fetch.max_redirects"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_concurrency_and_timeouts() {
        let mut config = Config::default();
        config.fetch.max_concurrent_items = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fetch.connect_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparseable_api_base() {
        let mut config = Config::default();
        config.resolvers.imgur_api_base = "not a url".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("resolvers.imgur_api_base"));
    }

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let config = FetchConfig {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            ..FetchConfig::default()
        };

        let json = serde_json::to_value(&config).expect("serialize failed");
        assert_eq!(
            json["connect_timeout"], 5,
            "duration_serde must serialize Duration as integer seconds"
        );
        assert_eq!(json["request_timeout"], 120);
    }

    #[tokio::test]
    async fn from_file_merges_ignored_domains_file() {
        let dir = TempDir::new().unwrap();
        let domains = dir.path().join("ignored.txt");
        std::fs::write(
            &domains,
            "# tracking sites\nSpam.example\n\nads.example # banners\nexample.com\n",
        )
        .unwrap();

        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                "[resolvers]\nignored_domains = [\"example.com\"]\nignored_domains_file = {:?}\n",
                domains.display().to_string()
            ),
        )
        .unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(
            config.resolvers.ignored_domains,
            vec!["example.com", "spam.example", "ads.example"]
        );
    }

    #[tokio::test]
    async fn from_file_reports_missing_domains_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[resolvers]\nignored_domains_file = \"/nonexistent/feed-archiver/ignored.txt\"\n",
        )
        .unwrap();

        match Config::from_file(&config_path).await {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("resolvers.ignored_domains_file"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn from_file_validates() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[fetch]\nmax_concurrent_items = 0\n").unwrap();

        assert!(matches!(
            Config::from_file(&config_path).await,
            Err(Error::Config { .. })
        ));
    }
}
