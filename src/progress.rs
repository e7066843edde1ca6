use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Progress tracking and reporting functionality.
///
/// Two pieces live here: the shared live-progress slot that concurrent
/// download tasks write into, and the batch statistics collected by the
/// orchestrator across one playlist run.

/// Most recent progress observation from any running download.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Completed fraction of the currently reporting transfer, 0.0..=1.0.
    pub fraction: f64,
    /// Transfer speed in bytes per second.
    pub speed_bps: f64,
    /// Short human-readable status line.
    pub status: String,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            fraction: 0.0,
            speed_bps: 0.0,
            status: String::from("idle"),
        }
    }
}

/// Shared, thread-safe progress sink.
///
/// A single mutable slot holding the newest `(fraction, speed)` pair.
/// Every active download writes into the same slot and the last writer
/// wins; no per-task identity is kept. With several items downloading
/// concurrently the observed value is an aggregate of whichever task
/// reported most recently. That is inherited behavior, kept on purpose.
///
/// # Examples
///
/// ```
/// use tubeload::ProgressReporter;
///
/// let reporter = ProgressReporter::new();
/// reporter.report(0.5, 1_048_576.0);
/// assert_eq!(reporter.snapshot().fraction, 0.5);
/// ```
#[derive(Clone, Default)]
pub struct ProgressReporter {
    slot: Arc<Mutex<ProgressSnapshot>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot with the newest observation. Callable
    /// concurrently from any number of downloads.
    pub fn report(&self, fraction: f64, speed_bps: f64) {
        let mut slot = self.slot.lock().unwrap();
        slot.fraction = fraction.clamp(0.0, 1.0);
        slot.speed_bps = speed_bps;
        slot.status = format!("downloading ({:.2} MB/s)", speed_bps / 1024.0 / 1024.0);
    }

    /// Marks one transfer finished. Only successful transfers emit this;
    /// a failed task simply stops reporting.
    pub fn report_finished(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.fraction = 1.0;
        slot.speed_bps = 0.0;
        slot.status = String::from("finished");
    }

    /// Returns a copy of the latest slot contents without blocking readers
    /// behind writers beyond the slot lock itself.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.slot.lock().unwrap().clone()
    }
}

/// Tracks and reports statistics for one batch of downloads.
///
/// Maintains totals, error counts and per-URL failure reasons while the
/// orchestrator drives its workers, and can export the failures to a
/// report file afterwards.
pub struct BatchProgress {
    pub total_items: usize,
    pub completed: usize,
    pub errors: usize,
    pub fallbacks: usize,
    pub start_time: Instant,
    failed_urls: Vec<(String, String)>, // (URL, reason)
}

impl BatchProgress {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            completed: 0,
            errors: 0,
            fallbacks: 0,
            start_time: Instant::now(),
            failed_urls: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.completed += 1;
    }

    pub fn record_fallback(&mut self) {
        self.completed += 1;
        self.fallbacks += 1;
    }

    pub fn record_failure(&mut self, url: &str, reason: String) {
        self.completed += 1;
        self.errors += 1;
        self.failed_urls.push((url.to_string(), reason));
    }

    pub fn succeeded(&self) -> usize {
        self.completed - self.errors
    }

    /// Exports failed download information to `failed.txt` under `dir`,
    /// appending to any existing report.
    pub fn export_failures(&self, dir: &Path) -> std::io::Result<()> {
        if self.failed_urls.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("failed.txt"))?;

        let mut writer = std::io::BufWriter::new(file);

        writeln!(
            writer,
            "\n=== Failed Downloads Report {} ===",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;

        for (url, reason) in &self.failed_urls {
            writeln!(writer, "URL: {}", url)?;
            writeln!(writer, "Error: {}", reason)?;
            writeln!(writer, "---")?;
        }

        writer.flush()?;
        Ok(())
    }
}
