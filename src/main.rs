use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};
use tubeload::catalog::BEST_FORMAT;
use tubeload::error::Result;
use tubeload::{Config, DownloadOutcome, Downloader, FormatFilter};

/// Main entry point for the application.
///
/// # Steps
/// 1. Initializes logging
/// 2. Parses the command line into a download request
/// 3. Resolves the URL and prints the format catalog
/// 4. Triggers the download and reports progress plus per-item outcomes
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    info!("Application completed successfully");
    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "tubeload")]
#[command(about = "Download videos and playlists through yt-dlp")]
#[command(version)]
struct Cli {
    /// Video or playlist URL
    url: String,

    /// Format id to download; the backend chooses when omitted
    #[arg(default_value = BEST_FORMAT)]
    format_id: String,

    /// Output directory (default: downloads)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Which catalog entries to show
    #[arg(long, value_enum, default_value_t = FilterArg::All)]
    filter: FilterArg,

    /// Show the catalog without downloading
    #[arg(long)]
    list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FilterArg {
    All,
    Video,
    Audio,
}

impl From<FilterArg> for FormatFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => FormatFilter::All,
            FilterArg::Video => FormatFilter::VideoOnly,
            FilterArg::Audio => FormatFilter::AudioOnly,
        }
    }
}

/// Resolves the URL, shows the catalog, and runs the download.
///
/// # Errors
/// Returns error if:
/// - Downloader creation fails
/// - The URL cannot be resolved at all
async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::default();
    if let Some(dir) = cli.out {
        config.output_dir = dir;
    }

    let downloader = Downloader::with_ytdlp(config).await?;

    let (resolved, catalog) = downloader
        .resolve_catalog(&cli.url, cli.filter.into())
        .await?;
    println!("Title: {}", resolved.title);
    println!(
        "Type: {}",
        if resolved.is_playlist() {
            "Playlist"
        } else {
            "Single Video"
        }
    );
    println!("Available formats:");
    for entry in &catalog {
        println!("  {}", entry.label);
    }

    if cli.list {
        return Ok(());
    }

    let progress = downloader.progress();
    let reporter = tokio::spawn(async move {
        let mut last = progress.snapshot();
        loop {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            let snap = progress.snapshot();
            if snap != last {
                println!("[{:>5.1}%] {}", snap.fraction * 100.0, snap.status);
                last = snap;
            }
        }
    });

    let outcomes = downloader.process_url(&cli.url, &cli.format_id).await?;
    reporter.abort();

    println!("\nDownload Summary:");
    for item in &outcomes {
        match &item.outcome {
            DownloadOutcome::Succeeded => println!("  ok       {}", item.url),
            DownloadOutcome::SucceededWithFallback(id) => {
                println!("  fallback {} (format {})", item.url, id)
            }
            DownloadOutcome::Failed(reason) => println!("  FAILED   {} ({})", item.url, reason),
        }
    }
    let failed = outcomes.iter().filter(|o| !o.outcome.is_success()).count();
    println!("Successfully downloaded: {}", outcomes.len() - failed);
    println!("Failed downloads: {}", failed);

    if !outcomes.is_empty() && failed == outcomes.len() {
        return Err("every item failed to download".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_url_with_defaults() {
        let cli = Cli::parse_from(["tubeload", "https://example.com/v"]);

        assert_eq!(cli.url, "https://example.com/v");
        assert_eq!(cli.format_id, BEST_FORMAT);
        assert_eq!(cli.filter, FilterArg::All);
        assert_eq!(cli.out, None);
        assert!(!cli.list);
    }

    #[test]
    fn parses_format_output_and_filter() {
        let cli = Cli::parse_from([
            "tubeload",
            "https://example.com/v",
            "22",
            "--out",
            "media",
            "--filter",
            "audio",
            "--list",
        ]);

        assert_eq!(cli.format_id, "22");
        assert_eq!(cli.out.as_deref(), Some(Path::new("media")));
        assert_eq!(FormatFilter::from(cli.filter), FormatFilter::AudioOnly);
        assert!(cli.list);
    }

    #[test]
    fn rejects_unknown_filter_value() {
        let result = Cli::try_parse_from(["tubeload", "https://example.com/v", "--filter", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_url() {
        assert!(Cli::try_parse_from(["tubeload"]).is_err());
    }

    #[test]
    fn rejects_stray_positional() {
        let result =
            Cli::try_parse_from(["tubeload", "https://example.com/v", "22", "extra"]);
        assert!(result.is_err());
    }
}
