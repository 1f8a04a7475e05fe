//! Single-file transfer with resume-by-existence and atomic `.part` semantics.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use crate::download::{DownloadProgress, Downloader, Traversal};
use crate::error::{Error, Result};
use crate::format::format_bytes;
use crate::fs::{FileSystem, part_path};
use crate::stats::{FileOrigin, FileStats};
use crate::transport::{Connector, Transport};

/// Tracks received bytes and tells when a reporting threshold was crossed.
#[derive(Debug)]
pub(crate) struct ProgressMeter {
    threshold: u64,
    received: u64,
    next_report: u64,
}

impl ProgressMeter {
    /// A threshold of zero disables reporting.
    pub(crate) const fn new(threshold: u64) -> Self {
        Self {
            threshold,
            received: 0,
            next_report: if threshold == 0 { u64::MAX } else { threshold },
        }
    }

    /// Adds `bytes` and returns the cumulative total if a multiple of the
    /// threshold was crossed. Several multiples crossed by one chunk are
    /// reported once.
    pub(crate) const fn record(&mut self, bytes: u64) -> Option<u64> {
        self.received = self.received.saturating_add(bytes);
        if self.threshold == 0 || self.received < self.next_report {
            return None;
        }
        self.next_report = (self.received / self.threshold)
            .saturating_add(1)
            .saturating_mul(self.threshold);
        Some(self.received)
    }
}

impl<C: Connector, F: FileSystem> Downloader<C, F> {
    /// Makes `name` from the current remote directory available in
    /// `local_folder`, counting it and notifying the traversal's progress.
    ///
    /// An existing destination is trusted as complete: no size or checksum
    /// is compared. Downloads land in `<dest>.part` and are renamed when the
    /// stream ends, so only complete files ever exist under the final name.
    pub(crate) fn transfer(
        &mut self,
        name: &str,
        local_folder: &Path,
        traversal: &mut Traversal<'_>,
    ) -> Result<()> {
        let dest = local_folder.join(name);
        if self.fs.exists(&dest) {
            log::info!("{} exists. Skipping download.", dest.display());
            traversal.report.add_present(dest.clone());
            traversal
                .progress
                .on_file_ready(&dest, FileOrigin::AlreadyPresent);
            return Ok(());
        }

        let stats = self.fetch(name, &dest, traversal.progress)?;
        log::debug!(
            "{} - {} ({}/s)",
            dest.display(),
            format_bytes(stats.size),
            format_bytes(stats.average_speed())
        );
        traversal.report.add_download(dest.clone(), &stats);
        traversal.progress.on_file_ready(&dest, FileOrigin::Downloaded);
        Ok(())
    }

    fn fetch(
        &mut self,
        name: &str,
        dest: &Path,
        progress: &dyn DownloadProgress,
    ) -> Result<FileStats> {
        let part = part_path(dest);
        log::info!("Downloading: {}", dest.display());
        progress.on_file_start(dest);

        let mut file = self.fs.create_file(&part)?;
        let mut meter = ProgressMeter::new(self.config.progress_threshold);
        let start = Instant::now();

        let streamed = {
            let mut sink = |chunk: &[u8]| -> std::io::Result<()> {
                file.write_all(chunk)?;
                if let Some(total) = meter.record(chunk.len() as u64) {
                    log::info!("{name}: {}", format_bytes(total));
                    progress.on_progress(dest, total);
                }
                Ok(())
            };
            self.session
                .connection()
                .and_then(|conn| conn.retrieve(name, &mut sink))
        };
        let result = streamed.and_then(|size| {
            file.flush().map(|()| size).map_err(|e| Error::Transfer {
                file: name.to_string(),
                message: e.to_string(),
            })
        });
        drop(file);

        match result {
            Ok(size) => {
                self.fs.rename_file(&part, dest)?;
                Ok(FileStats {
                    size,
                    elapsed: start.elapsed(),
                })
            }
            Err(e) => {
                if self.config.cleanup_on_error
                    && let Err(rm) = self.fs.remove_file(&part)
                {
                    log::warn!("Could not remove {}: {rm}", part.display());
                }
                progress.on_error(dest, &e.to_string());
                Err(e)
            }
        }
    }
}
