//! External video extraction
//!
//! Video pages (YouTube, Reddit video) cannot be fetched with a plain GET. They
//! are handed to a yt-dlp compatible tool behind the [`VideoExtractor`] trait:
//!
//! - [`CliVideoExtractor`]: runs `yt-dlp` or `youtube-dl`
//! - [`NoOpVideoExtractor`]: used when neither is installed; every download fails
//!
//! ## Usage
//!
//! ```no_run
//! use feed_archiver::config::VideoConfig;
//! use feed_archiver::video::extractor_from_config;
//!
//! let extractor = extractor_from_config(&VideoConfig::default());
//! println!("using {}", extractor.name());
//! ```

mod cli;
mod noop;
mod traits;

pub use cli::{CliVideoExtractor, DEFAULT_BINARY_NAMES, output_template};
pub use noop::NoOpVideoExtractor;
pub use traits::{VideoDownload, VideoExtractor};

use crate::config::VideoConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// The configured extractor, or [`NoOpVideoExtractor`] if no binary is available
pub fn extractor_from_config(config: &VideoConfig) -> Arc<dyn VideoExtractor> {
    match CliVideoExtractor::from_config(config) {
        Some(extractor) => {
            info!(binary = ?extractor.binary_path(), "video extraction enabled");
            Arc::new(extractor)
        }
        None => {
            warn!("no video extractor found; video posts will fail");
            Arc::new(NoOpVideoExtractor)
        }
    }
}
