use crate::catalog::FormatDescriptor;
use crate::error::{AppError, Result};
use crate::progress::ProgressReporter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

/// Extraction backend boundary.
///
/// All protocol negotiation with the remote media host lives behind the
/// `MediaSource` trait. The production implementation drives the `yt-dlp`
/// binary as a subprocess: metadata comes from its single-JSON dump, bytes
/// and progress from a download invocation with a newline progress
/// template. Tests substitute a scripted in-memory source.

/// One downloadable unit, produced by `resolve`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub source_url: String,
    /// Absent until the item itself has been resolved (playlist entries
    /// sometimes arrive without titles).
    pub title: Option<String>,
}

/// Result of resolving a URL: either a single item (empty `entries`) or a
/// playlist of items, plus the formats offered for the resolved page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub title: String,
    pub entries: Vec<MediaItem>,
    pub formats: Vec<FormatDescriptor>,
}

impl ResolvedMedia {
    pub fn is_playlist(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Backend capable of resolving media URLs and transferring their bytes.
///
/// `fetch` must stream progress into the given reporter while it runs and
/// emit the terminal finished update only on success. Any failure is
/// reported through the error taxonomy so the caller can decide whether a
/// fallback attempt is worthwhile.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Resolves a URL into title, playlist entries and offered formats.
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia>;

    /// Downloads `url` in the requested format, writing to
    /// `output_template` (a path whose file name may contain the backend's
    /// `%(ext)s` placeholder).
    async fn fetch(
        &self,
        url: &str,
        format_id: &str,
        output_template: &Path,
        progress: &ProgressReporter,
    ) -> Result<()>;
}

/// Production `MediaSource` backed by the `yt-dlp` binary.
pub struct YtDlpSource {
    binary: PathBuf,
    socket_timeout_secs: u64,
}

impl YtDlpSource {
    pub fn new(binary: Option<PathBuf>, socket_timeout_secs: u64) -> Self {
        Self {
            binary: binary.unwrap_or_else(find_ytdlp),
            socket_timeout_secs,
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
        ]
    }
}

#[async_trait]
impl MediaSource for YtDlpSource {
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia> {
        // A URL that does not parse can never resolve; classify it the same
        // way as any other resolution failure.
        Url::parse(url).map_err(|e| AppError::Resolution(format!("invalid url {}: {}", url, e)))?;

        let mut args = self.base_args();
        args.push("-J".to_string());
        args.push(url.to_string());

        debug!("resolving {} via {:?}", url, self.binary);
        let output = Command::new(&self.binary).args(&args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Resolution(stderr.trim().to_string()));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_resolved(&json))
    }

    async fn fetch(
        &self,
        url: &str,
        format_id: &str,
        output_template: &Path,
        progress: &ProgressReporter,
    ) -> Result<()> {
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            format_id.to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            "download:%(progress._percent_str)s %(progress.speed)s".to_string(),
            url.to_string(),
        ]);

        debug!("fetching {} with format {}", url, format_id);
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Custom("child stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Custom("child stderr not captured".to_string()))?;

        let stream_progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some((fraction, speed)) = parse_progress_line(&line) {
                    progress.report(fraction, speed);
                }
            }
        };
        let collect_stderr = async {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        };
        let ((), stderr_text) = tokio::join!(stream_progress, collect_stderr);

        let status = child.wait().await?;
        if !status.success() {
            warn!("yt-dlp exited with {} for {}", status, url);
            return Err(classify_fetch_error(&stderr_text, status.code()));
        }

        progress.report_finished();
        Ok(())
    }
}

/// Locates the yt-dlp binary: common install paths first, then `which`,
/// finally bare `yt-dlp` and hope it is on PATH.
fn find_ytdlp() -> PathBuf {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];
    for path in common_paths {
        if Path::new(path).exists() {
            return PathBuf::from(path);
        }
    }

    if let Ok(output) = std::process::Command::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    PathBuf::from("yt-dlp")
}

fn parse_resolved(json: &serde_json::Value) -> ResolvedMedia {
    let title = json["title"].as_str().unwrap_or("Unknown").to_string();

    let entries = json["entries"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    let url = e["url"]
                        .as_str()
                        .or_else(|| e["webpage_url"].as_str())?
                        .to_string();
                    Some(MediaItem {
                        source_url: url,
                        title: e["title"].as_str().map(|s| s.to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ResolvedMedia {
        title,
        entries,
        formats: parse_formats(json),
    }
}

fn parse_formats(json: &serde_json::Value) -> Vec<FormatDescriptor> {
    let Some(formats) = json["formats"].as_array() else {
        return Vec::new();
    };

    formats
        .iter()
        .map(|f| {
            let vcodec = f["vcodec"].as_str();
            let acodec = f["acodec"].as_str();
            FormatDescriptor {
                format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                resolution: f["resolution"].as_str().map(|s| s.to_string()),
                has_video: vcodec.map_or(false, |v| v != "none"),
                has_audio: acodec.map_or(false, |a| a != "none"),
                filesize: f["filesize"]
                    .as_u64()
                    .or_else(|| f["filesize_approx"].as_u64()),
                ext: f["ext"].as_str().map(|s| s.to_string()),
            }
        })
        .collect()
}

/// Parses one `--newline` progress line emitted with our template, e.g.
/// `download:  45.2% 1048576.0`. Speed is `NA` while yt-dlp is still
/// estimating.
fn parse_progress_line(line: &str) -> Option<(f64, f64)> {
    let rest = line.trim().strip_prefix("download:")?;
    let mut parts = rest.split_whitespace();
    let percent = parts.next()?.strip_suffix('%')?.trim().parse::<f64>().ok()?;
    let speed = parts
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    Some((percent / 100.0, speed))
}

fn classify_fetch_error(stderr: &str, code: Option<i32>) -> AppError {
    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with code {:?}", code));

    if stderr.contains("Requested format is not available") {
        AppError::FormatUnavailable(detail)
    } else {
        AppError::Transfer(detail)
    }
}
