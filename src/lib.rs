/// A concurrent media downloader core.
///
/// This library resolves video or playlist URLs through an extraction
/// backend, offers the available encodings as a labeled catalog, and
/// downloads the selection with a bounded worker pool, per-item format
/// fallback and a shared aggregate progress slot.
///
/// # Architecture
///
/// The application is structured into several key components:
/// - `Config`: Application configuration management
/// - `Downloader`: Single-item download with fallback plus the playlist
///   orchestrator
/// - `MediaSource`: Extraction backend boundary (yt-dlp in production)
/// - `ProgressReporter`: Shared last-writer-wins progress slot
/// - `build_catalog` / `sanitize`: Pure helpers for format labeling and
///   filesystem-safe filenames
///
/// # Example
/// ```no_run
/// use tubeload::{Config, Downloader};
///
/// async fn example() {
///     let downloader = Downloader::with_ytdlp(Config::default()).await.unwrap();
///     let outcomes = downloader
///         .process_url("https://example.com/watch?v=abc", "22")
///         .await
///         .unwrap();
///     for item in outcomes {
///         println!("{}: {:?}", item.url, item.outcome);
///     }
/// }
/// ```
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod progress;
pub mod sanitize;

// Re-export commonly used items
pub use catalog::{build_catalog, catalog_or_best, CatalogEntry, FormatDescriptor, FormatFilter};
pub use config::Config;
pub use downloader::{DownloadOutcome, Downloader, ItemOutcome};
pub use error::AppError;
pub use extractor::{MediaItem, MediaSource, ResolvedMedia, YtDlpSource};
pub use progress::{ProgressReporter, ProgressSnapshot};
pub use sanitize::sanitize;
