use crate::catalog::{catalog_or_best, safe_formats, CatalogEntry, FormatFilter};
use crate::config::Config;
use crate::error::Result;
use crate::extractor::{MediaItem, MediaSource, ResolvedMedia, YtDlpSource};
use crate::progress::{BatchProgress, ProgressReporter};
use crate::sanitize::sanitize;
use futures::stream::{self, StreamExt};

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, instrument, warn};

/// A downloader that manages concurrent media downloads with per-item
/// format fallback.
///
/// # Fields
/// * `source` - Extraction backend performing resolution and byte transfer
/// * `semaphore` - Controls concurrent download limits
/// * `config` - Application configuration settings
/// * `progress` - Shared progress slot written by all active transfers
/// * `active_downloads` / `peak_active` - Counters for currently and
///   maximally active downloads
pub struct Downloader {
    source: Arc<dyn MediaSource>,
    semaphore: Arc<Semaphore>,
    config: Arc<Config>,
    progress: ProgressReporter,
    active_downloads: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
}

/// Terminal status of one item's download attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// The requested format downloaded on the first attempt.
    Succeeded,
    /// The requested format was rejected and the single fallback attempt
    /// succeeded with the contained format id.
    SucceededWithFallback(String),
    /// Both the requested format and the fallback (if any existed) failed.
    Failed(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DownloadOutcome::Failed(_))
    }
}

/// Per-item result reported by the orchestrator after join-all.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub url: String,
    pub outcome: DownloadOutcome,
}

impl Downloader {
    /// Creates a new `Downloader` over the given extraction backend.
    ///
    /// # Errors
    /// * If output directory creation fails
    pub async fn new(config: Config, source: Arc<dyn MediaSource>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.output_dir).await?;

        Ok(Self {
            source,
            semaphore: Arc::new(Semaphore::new(config.concurrent_downloads)),
            config: Arc::new(config),
            progress: ProgressReporter::new(),
            active_downloads: Arc::new(AtomicUsize::new(0)),
            peak_active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Creates a `Downloader` backed by the yt-dlp binary.
    pub async fn with_ytdlp(config: Config) -> Result<Self> {
        let source = Arc::new(YtDlpSource::new(
            config.ytdlp_path.clone(),
            config.socket_timeout_secs,
        ));
        Self::new(config, source).await
    }

    /// Resolves a URL and builds the user-facing catalog for it.
    ///
    /// # Returns
    /// The resolved metadata plus the labeled catalog after `filter`; when
    /// nothing survives, a single synthetic "best available" entry.
    pub async fn resolve_catalog(
        &self,
        url: &str,
        filter: FormatFilter,
    ) -> Result<(ResolvedMedia, Vec<CatalogEntry>)> {
        let resolved = self.source.resolve(url).await?;
        let catalog = catalog_or_best(&resolved.formats, filter);
        Ok((resolved, catalog))
    }

    /// Downloads one media item in the requested format.
    ///
    /// # Algorithm
    /// 1. Resolve the URL for its title and sanitize it into the output
    ///    filename.
    /// 2. Attempt the transfer with `format_id` exactly as given.
    /// 3. On any transfer failure, re-resolve fresh and retry once with the
    ///    last independently playable format in backend order.
    /// 4. A second failure, or an empty safe subset, is terminal.
    ///
    /// Failures never escape as errors; they are folded into the returned
    /// outcome so one item can never poison its siblings.
    #[instrument(skip(self))]
    pub async fn download_one(&self, url: &str, format_id: &str) -> DownloadOutcome {
        let _active = DownloadGuard::new(&self.active_downloads, &self.peak_active);
        match self.attempt_with_fallback(url, format_id).await {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::Failed(e.to_string()),
        }
    }

    async fn attempt_with_fallback(&self, url: &str, format_id: &str) -> Result<DownloadOutcome> {
        // Resolution failure is fatal for the item; no transfer is attempted.
        let resolved = self.source.resolve(url).await?;
        let template = self.output_template(&resolved.title);

        let primary = match self
            .source
            .fetch(url, format_id, &template, &self.progress)
            .await
        {
            Ok(()) => return Ok(DownloadOutcome::Succeeded),
            Err(e) => e,
        };
        warn!("format {} failed for {}: {}", format_id, url, primary);

        // The offer list may have changed since the first attempt, so the
        // fallback works from a fresh resolution.
        let fresh = self.source.resolve(url).await?;
        let safe = safe_formats(&fresh.formats);
        let Some(fallback) = safe.last() else {
            return Ok(DownloadOutcome::Failed(primary.to_string()));
        };
        // Last entry in backend order. Inherited heuristic: the backend
        // ranks its own list, we do not recompute quality locally.
        let fallback_id = fallback.format_id.clone();
        info!("retrying {} with fallback format {}", url, fallback_id);

        match self
            .source
            .fetch(url, &fallback_id, &template, &self.progress)
            .await
        {
            Ok(()) => Ok(DownloadOutcome::SucceededWithFallback(fallback_id)),
            Err(second) => Ok(DownloadOutcome::Failed(second.to_string())),
        }
    }

    /// Fans a list of items out across the bounded worker pool.
    ///
    /// # Details
    /// * At most `concurrent_downloads` items transfer simultaneously
    /// * Per-item failures are isolated; siblings keep running
    /// * Returns only after every item reached a terminal outcome
    /// * No ordering guarantee: the result order is completion order
    #[instrument(skip(self, items))]
    pub async fn download_all(&self, items: &[MediaItem], format_id: &str) -> Vec<ItemOutcome> {
        let total = items.len();
        info!("downloading {} items", total);
        let batch = Arc::new(Mutex::new(BatchProgress::new(total)));

        let outcomes = stream::iter(items.iter().cloned())
            .map(|item| {
                let batch = Arc::clone(&batch);
                let sem = Arc::clone(&self.semaphore);
                let format_id = format_id.to_string();

                async move {
                    let _permit = sem.acquire().await.unwrap();
                    let outcome = self.download_one(&item.source_url, &format_id).await;

                    let mut batch_guard = batch.lock().await;
                    match &outcome {
                        DownloadOutcome::Succeeded => batch_guard.record_success(),
                        DownloadOutcome::SucceededWithFallback(id) => {
                            info!("{} completed via fallback {}", item.source_url, id);
                            batch_guard.record_fallback();
                        }
                        DownloadOutcome::Failed(reason) => {
                            warn!("{} failed: {}", item.source_url, reason);
                            batch_guard.record_failure(&item.source_url, reason.clone());
                        }
                    }

                    ItemOutcome {
                        url: item.source_url,
                        outcome,
                    }
                }
            })
            .buffer_unordered(self.config.concurrent_downloads)
            .collect::<Vec<_>>()
            .await;

        let final_batch = batch.lock().await;
        info!(
            "batch of {} finished in {:.1}s: {} succeeded ({} via fallback), {} failed",
            final_batch.total_items,
            final_batch.start_time.elapsed().as_secs_f64(),
            final_batch.succeeded(),
            final_batch.fallbacks,
            final_batch.errors,
        );
        if let Err(e) = final_batch.export_failures(&self.config.output_dir) {
            warn!("could not export failure report: {}", e);
        }

        outcomes
    }

    /// Resolves a URL and downloads it: a playlist is fanned out across the
    /// pool, a single video goes straight to `download_one`.
    pub async fn process_url(&self, url: &str, format_id: &str) -> Result<Vec<ItemOutcome>> {
        let resolved = self.source.resolve(url).await?;

        if resolved.is_playlist() {
            info!(
                "playlist '{}' with {} entries",
                resolved.title,
                resolved.entries.len()
            );
            Ok(self.download_all(&resolved.entries, format_id).await)
        } else {
            let outcome = self.download_one(url, format_id).await;
            Ok(vec![ItemOutcome {
                url: url.to_string(),
                outcome,
            }])
        }
    }

    /// Handle for observing the shared progress slot.
    pub fn progress(&self) -> ProgressReporter {
        self.progress.clone()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Highest number of downloads that were ever active at once.
    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    fn output_template(&self, title: &str) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.%(ext)s", sanitize(title)))
    }
}

/// RAII guard for tracking active downloads.
///
/// Increments the active counter on creation, folds the new value into the
/// peak watermark, and decrements on drop.
struct DownloadGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> DownloadGuard<'a> {
    fn new(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl<'a> Drop for DownloadGuard<'a> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
