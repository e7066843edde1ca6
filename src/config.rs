use serde::Deserialize;
use std::path::PathBuf;

/// Configuration management for the application.
///
/// Provides centralized configuration options for controlling:
/// - Concurrent download limits
/// - Output directory
/// - Extraction backend location and timeouts

/// Configuration for the download core.
///
/// # Examples
///
/// ```
/// use tubeload::Config;
///
/// let config = Config::default();
/// assert!(config.concurrent_downloads > 0);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Upper bound on simultaneously running download tasks.
    pub concurrent_downloads: usize,
    /// Directory receiving the downloaded files; created if absent.
    pub output_dir: PathBuf,
    /// Explicit path to the yt-dlp binary; discovered on PATH when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Socket timeout passed through to the backend, in seconds.
    pub socket_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrent_downloads: 4,
            output_dir: PathBuf::from("downloads"),
            ytdlp_path: None,
            socket_timeout_secs: 30,
        }
    }
}
