//! Download statistics and traversal reports.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How a ready file came to be on local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    /// Bytes were fetched during this traversal.
    Downloaded,
    /// The destination already existed and was not fetched again.
    AlreadyPresent,
}

/// A file that has been made available locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyFile {
    /// Local destination path.
    pub path: PathBuf,
    /// Whether the file was fetched or found on disk.
    pub origin: FileOrigin,
}

/// Statistics for a single file transfer.
#[derive(Debug, Clone)]
pub struct FileStats {
    /// Bytes written to local storage.
    pub size: u64,
    /// Time taken to stream the file.
    pub elapsed: Duration,
}

impl FileStats {
    /// Returns the average transfer speed in bytes per second.
    #[must_use]
    pub fn average_speed(&self) -> u64 {
        bytes_per_sec(self.size, self.elapsed)
    }
}

/// Outcome of one top-level download operation.
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    /// Files made available locally, downloaded or already present.
    /// Always equal to `ready.len()`.
    pub files_ready: usize,
    /// Files counted against the limit: the ready files plus filtered
    /// files when those are configured to count.
    pub counted: usize,
    /// Files fetched over the network.
    pub files_downloaded: usize,
    /// Files skipped because the destination already existed.
    pub files_present: usize,
    /// Files rejected by the filter.
    pub files_filtered: usize,
    /// Remote directories descended into.
    pub directories: usize,
    /// Bytes fetched over the network.
    pub total_bytes: u64,
    /// Wall-clock time of the operation.
    pub elapsed: Duration,
    /// Whether the traversal stopped because the limit was hit.
    pub limit_reached: bool,
    /// Ready files, in notification order.
    pub ready: Vec<ReadyFile>,
}

impl WalkReport {
    /// Returns the average download speed in bytes per second.
    #[must_use]
    pub fn average_speed(&self) -> u64 {
        bytes_per_sec(self.total_bytes, self.elapsed)
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn bytes_per_sec(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Accumulates a [`WalkReport`] while a traversal runs.
#[derive(Debug)]
pub struct WalkReportBuilder {
    report: WalkReport,
    start_time: Instant,
}

impl Default for WalkReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkReportBuilder {
    /// Creates an empty builder and starts the clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            report: WalkReport::default(),
            start_time: Instant::now(),
        }
    }

    /// Records a file fetched over the network.
    pub fn add_download(&mut self, path: PathBuf, stats: &FileStats) {
        self.report.files_downloaded += 1;
        self.report.total_bytes += stats.size;
        self.push_ready(path, FileOrigin::Downloaded);
    }

    /// Records a file whose destination already existed.
    pub fn add_present(&mut self, path: PathBuf) {
        self.report.files_present += 1;
        self.push_ready(path, FileOrigin::AlreadyPresent);
    }

    /// Records a file rejected by the filter.
    ///
    /// `counts` says whether the rejection consumes the limit budget.
    pub const fn add_filtered(&mut self, counts: bool) {
        self.report.files_filtered += 1;
        if counts {
            self.report.counted += 1;
        }
    }

    /// Records a descent into a remote directory.
    pub const fn add_directory(&mut self) {
        self.report.directories += 1;
    }

    /// Marks the traversal as stopped by the limit.
    pub const fn set_limit_reached(&mut self) {
        self.report.limit_reached = true;
    }

    /// Returns `true` once [`WalkReportBuilder::set_limit_reached`] was called.
    #[must_use]
    pub const fn is_limit_reached(&self) -> bool {
        self.report.limit_reached
    }

    /// Number of files counted against the limit so far.
    #[must_use]
    pub const fn counted(&self) -> usize {
        self.report.counted
    }

    fn push_ready(&mut self, path: PathBuf, origin: FileOrigin) {
        self.report.files_ready += 1;
        self.report.counted += 1;
        self.report.ready.push(ReadyFile { path, origin });
    }

    /// Builds the final report.
    #[must_use]
    pub fn build(mut self) -> WalkReport {
        self.report.elapsed = self.start_time.elapsed();
        self.report
    }
}
