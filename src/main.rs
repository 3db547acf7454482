use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use feed_archiver::utils::check_hard_link_support;
use feed_archiver::{Config, Post, ReportEntry, RunSummary, Saver, ViewKind, cancel_on_signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "feed-archiver",
    version,
    about = "Archive media linked from feed posts into hard-linked local views"
)]
struct Cli {
    /// Feed files: JSON arrays of posts
    #[arg(required = true)]
    feeds: Vec<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage root, overriding `storage.root`
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// View the feeds are saved under: saved-post or followed-author
    #[arg(long, default_value = "saved-post")]
    view: ViewKind,

    /// Items saved concurrently, overriding `fetch.max_concurrent_items`
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the run report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) if summary.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> feed_archiver::Result<RunSummary> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    if let Some(root) = cli.root {
        config.storage.root = root;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.max_concurrent_items = concurrency;
    }
    config.validate()?;

    check_hard_link_support(&config.storage.root).await?;
    let saver = Saver::new(config).await?;

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());

    let mut summary = RunSummary::default();
    for feed in &cli.feeds {
        if cancel.is_cancelled() {
            break;
        }
        summary.merge(save_feed_file(&saver, feed, cli.view, &cancel).await?);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&summary);
    }
    Ok(summary)
}

async fn save_feed_file(
    saver: &Saver,
    path: &Path,
    view: ViewKind,
    cancel: &CancellationToken,
) -> feed_archiver::Result<RunSummary> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        feed_archiver::Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read feed '{}': {}", path.display(), e),
        ))
    })?;
    let posts: Vec<Post> = serde_json::from_str(&content)?;
    let total = posts.len();

    let mut summary = RunSummary {
        filtered: posts
            .iter()
            .filter(|post| saver.skip_reason(post, view).is_some())
            .count(),
        ..RunSummary::default()
    };

    for (post, outcome) in saver.save_feed(posts, view, cancel).await {
        summary.record(&post, &outcome);
    }

    tracing::info!(
        feed = ?path,
        %view,
        posts = total,
        saved = summary.saved,
        already_saved = summary.already_saved,
        failed = summary.failed.len() + summary.corrupted.len(),
        "feed processed"
    );
    Ok(summary)
}

fn print_report(summary: &RunSummary) {
    println!(
        "{} saved ({} bytes), {} already saved, {} filtered",
        summary.saved, summary.bytes, summary.already_saved, summary.filtered
    );
    print_section("Ignored", &summary.ignored);
    print_section("Not found", &summary.not_found);
    print_section("Not matched", &summary.not_matched);
    print_section("Failed", &summary.failed);
    print_section("Corrupted", &summary.corrupted);
}

fn print_section(title: &str, entries: &[ReportEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, entries.len());
    for entry in entries {
        match &entry.message {
            Some(message) => println!("  {} {} - {}", entry.reference, entry.url, message),
            None => println!("  {} {}", entry.reference, entry.url),
        }
    }
}
