//! # feed-archiver
//!
//! Archives media linked from feed posts into hard-linked local views.
//!
//! ## Design Philosophy
//!
//! feed-archiver is designed to be:
//! - **Idempotent** - the filesystem is the only record; re-runs skip what exists
//! - **Consistent** - every view holds the same bytes or none of them
//! - **Pluggable** - content hosts are [`MediaResolver`] implementations
//! - **Stateless** - each item yields a [`SaveOutcome`]; callers fold them into a [`RunSummary`]
//!
//! ## Layout
//!
//! One artifact is written once, to its primary path, and hard-linked into every
//! other view:
//!
//! ```text
//! <root>/saved/all/<date> - <id> - <title>.png             (primary)
//! <root>/saved/<category>/<date> - <id> - <title>.png
//! <root>/categories/<category>/<date> - <author> - <id> - <title>.png
//! <root>/all/<date> - <author> - <id> - <title>.png
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_archiver::{Config, Post, RunSummary, Saver, ViewKind};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("feed-archiver.toml").await?;
//!     let saver = Saver::new(config).await?;
//!
//!     let posts: Vec<Post> = serde_json::from_str(&std::fs::read_to_string("saved.json")?)?;
//!     let cancel = CancellationToken::new();
//!
//!     let mut summary = RunSummary::default();
//!     for (post, outcome) in saver.save_feed(posts, ViewKind::SavedPost, &cancel).await {
//!         summary.record(&post, &outcome);
//!     }
//!     println!("saved {} items", summary.saved);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Primary and secondary path computation
pub mod location;
/// Media model
pub mod media;
/// Host capabilities that turn URLs into media
pub mod resolver;
/// Save orchestration
pub mod saver;
/// HTTP download transport
pub mod transport;
/// Core types and outcomes
pub mod types;
/// Utility functions
pub mod utils;
/// External video extraction
pub mod video;

// Re-export commonly used types
pub use config::Config;
pub use error::{DownloadError, Error, Result, SaveFailure};
pub use location::{FilenameRules, LocalLocation, LocationResolver};
pub use media::{Media, Metadata};
pub use resolver::{MediaResolver, ResolveResult, ResolverChain};
pub use saver::Saver;
pub use types::{Post, ReportEntry, RunSummary, SaveOutcome, ViewKind};
pub use video::{CliVideoExtractor, NoOpVideoExtractor, VideoDownload, VideoExtractor};

/// Cancel `token` when the process receives a termination signal.
///
/// Spawns a task that waits for the signal, so it returns immediately. Work
/// already running observes the token and stops at its next checkpoint.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use feed_archiver::cancel_on_signal;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() {
///     let cancel = CancellationToken::new();
///     cancel_on_signal(cancel.clone());
///     cancel.cancelled().await;
/// }
/// ```
pub fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Cancelling in-flight saves");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal handlers may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
