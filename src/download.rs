//! Recursive, filtered, resumable folder downloads.

use std::path::Path;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::fs::{FileSystem, StdFileSystem};
use crate::session::Session;
use crate::stats::{FileOrigin, WalkReport, WalkReportBuilder};
use crate::transport::ftp::FtpConnector;
use crate::transport::{
    Connector, Credentials, EntryKind, RemoteEntry, Transport, join_remote, split_remote,
};

/// Trait for receiving download progress updates.
///
/// Implement this trait to be notified while a traversal runs. All methods
/// have default no-op implementations for convenience.
pub trait DownloadProgress: Send + Sync {
    /// Called before the bytes of a file start arriving.
    fn on_file_start(&self, _path: &Path) {}

    /// Called each time the cumulative byte count of a file crosses the
    /// configured reporting threshold.
    fn on_progress(&self, _path: &Path, _bytes: u64) {}

    /// Called exactly once per file, after its bytes are on local storage.
    fn on_file_ready(&self, _path: &Path, _origin: FileOrigin) {}

    /// Called for a remote file rejected by the filter.
    fn on_skipped(&self, _remote: &str) {}

    /// Called when a file transfer fails.
    fn on_error(&self, _path: &Path, _error: &str) {}

    /// Called once when the file-count limit stops the traversal.
    fn on_limit_reached(&self, _limit: usize) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

/// Adapts a plain `Fn(&Path)` into a [`DownloadProgress`] that only listens
/// for ready files.
pub struct OnFileReady<F>(pub F);

impl<F: Fn(&Path) + Send + Sync> DownloadProgress for OnFileReady<F> {
    fn on_file_ready(&self, path: &Path, _origin: FileOrigin) {
        (self.0)(path);
    }
}

/// State of one top-level traversal, threaded through the recursion.
pub(crate) struct Traversal<'a> {
    pub(crate) progress: &'a dyn DownloadProgress,
    pub(crate) report: WalkReportBuilder,
    limit: Option<usize>,
    count_filtered: bool,
}

impl<'a> Traversal<'a> {
    fn new(progress: &'a dyn DownloadProgress, limit: Option<usize>, count_filtered: bool) -> Self {
        Self {
            progress,
            report: WalkReportBuilder::new(),
            // zero means unlimited
            limit: limit.filter(|&l| l > 0),
            count_filtered,
        }
    }

    /// Returns `true` once the limit has been hit, notifying the first time.
    fn limit_reached(&mut self) -> bool {
        let Some(limit) = self.limit else {
            return false;
        };
        if self.report.counted() < limit {
            return false;
        }
        if !self.report.is_limit_reached() {
            log::info!("File limit of {limit} reached!");
            self.report.set_limit_reached();
            self.progress.on_limit_reached(limit);
        }
        true
    }

    fn finish(self) -> WalkReport {
        self.report.build()
    }
}

/// Downloads remote files and folders through one reusable session.
pub struct Downloader<C: Connector = FtpConnector, F: FileSystem = StdFileSystem> {
    pub(crate) session: Session<C>,
    pub(crate) config: DownloadConfig,
    pub(crate) fs: F,
    filter: Filter,
}

impl Downloader<FtpConnector, StdFileSystem> {
    /// Creates an FTP downloader for the server and credentials in `config`.
    #[must_use]
    pub fn new(config: DownloadConfig, filter: Filter) -> Self {
        Self::with_connector(FtpConnector::from_config(&config), config, filter)
    }
}

impl<C: Connector> Downloader<C, StdFileSystem> {
    /// Creates a downloader using a custom connector.
    #[must_use]
    pub fn with_connector(connector: C, config: DownloadConfig, filter: Filter) -> Self {
        Self::with_fs(connector, config, filter, StdFileSystem)
    }
}

impl<C: Connector, F: FileSystem> Downloader<C, F> {
    /// Creates a downloader with a custom connector and file system.
    #[must_use]
    pub fn with_fs(connector: C, config: DownloadConfig, filter: Filter, fs: F) -> Self {
        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };
        Self {
            session: Session::new(connector, credentials),
            config,
            fs,
            filter,
        }
    }

    /// Returns the filter applied to remote file names.
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns a reference to the download configuration.
    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Downloads every file under `remote_folder` that passes the filter into
    /// `local_folder`, mirroring subdirectories, until `limit` files have
    /// been made ready (`None` or `Some(0)` for no limit).
    ///
    /// Files already present locally are not fetched again but are still
    /// reported and counted. The session is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Path`] if the root cannot be
    /// reached, and [`Error::Interrupted`] wrapping the cause for any failure
    /// after the traversal started. Completed files stay on disk.
    pub fn download_folder(
        &mut self,
        remote_folder: &str,
        local_folder: &Path,
        progress: &dyn DownloadProgress,
        limit: Option<usize>,
    ) -> Result<WalkReport> {
        let mut traversal = Traversal::new(progress, limit, self.config.count_filtered);
        log::info!(
            "Downloading {remote_folder} to {} (filter: {})",
            local_folder.display(),
            self.filter
        );

        let root = match self.enter_root(remote_folder) {
            Ok(root) => root,
            Err(e) => {
                self.close_session();
                return Err(e);
            }
        };
        let walked = self.walk(&root, local_folder, &mut traversal);
        self.close_session();

        let report = traversal.finish();
        match walked {
            Ok(()) => Ok(report),
            Err(e) => Err(Error::Interrupted {
                report: Box::new(report),
                source: Box::new(e),
            }),
        }
    }

    /// Downloads a single remote file into `local_folder`.
    ///
    /// The filter is not applied. The session is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote directory cannot be entered, the local
    /// folder cannot be created or the transfer fails.
    pub fn download_file(
        &mut self,
        remote_file: &str,
        local_folder: &Path,
        progress: &dyn DownloadProgress,
    ) -> Result<WalkReport> {
        let (dir, name) = split_remote(remote_file);
        if name.is_empty() {
            return Err(Error::Path {
                path: remote_file.to_string(),
                message: "not a file path".to_string(),
            });
        }

        let mut traversal = Traversal::new(progress, None, false);
        let result = self.fetch_single(dir, name, local_folder, &mut traversal);
        self.close_session();
        result.map(|()| traversal.finish())
    }

    fn fetch_single(
        &mut self,
        dir: &str,
        name: &str,
        local_folder: &Path,
        traversal: &mut Traversal<'_>,
    ) -> Result<()> {
        if dir.is_empty() {
            self.session.connection()?;
        } else {
            self.session.change_directory(dir)?;
        }
        self.fs.create_dir_all(local_folder)?;
        self.transfer(name, local_folder, traversal)
    }

    /// Enters the traversal root and returns it as an absolute path.
    ///
    /// An empty root means the login directory.
    fn enter_root(&mut self, remote_folder: &str) -> Result<String> {
        let trimmed = remote_folder.trim_end_matches('/');
        let root = match trimmed {
            "" if remote_folder.starts_with('/') => "/",
            "" => ".",
            _ => trimmed,
        };
        self.session.change_directory(root)?;
        if root.starts_with('/') {
            Ok(root.to_string())
        } else {
            self.session.current_dir()
        }
    }

    fn close_session(&mut self) {
        if let Err(e) = self.session.close() {
            log::warn!("Error closing session: {e}");
        }
    }

    /// Decides whether a listing entry is a file or a directory.
    ///
    /// Listing facts win. Without them the entry is probed by entering it:
    /// success means directory, a refusal means file. A server that accepts
    /// `CWD` on a file name will have that file treated as a directory.
    fn classify(&mut self, remote: &str, entry: &RemoteEntry) -> Result<EntryKind> {
        if let Some(kind) = entry.kind {
            return Ok(kind);
        }
        match self.session.change_directory(remote) {
            Ok(()) => Ok(EntryKind::Directory),
            Err(Error::Path { .. }) => Ok(EntryKind::File),
            Err(e) => Err(e),
        }
    }

    fn walk(&mut self, dir: &str, local: &Path, traversal: &mut Traversal<'_>) -> Result<()> {
        log::info!("Downloading files to {}", local.display());
        self.fs.create_dir_all(local)?;
        self.session.change_directory(dir)?;
        let entries = self.session.connection()?.list()?;

        for entry in entries {
            let remote = join_remote(dir, &entry.name);
            match self.classify(&remote, &entry)? {
                EntryKind::Directory => {
                    traversal.report.add_directory();
                    self.walk(&remote, &local.join(&entry.name), traversal)?;
                }
                EntryKind::File if self.filter.matches(&entry.name) => {
                    self.session.change_directory(dir)?;
                    self.transfer(&entry.name, local, traversal)?;
                }
                EntryKind::File => {
                    log::debug!("Skipping {remote}");
                    traversal.progress.on_skipped(&remote);
                    traversal.report.add_filtered(traversal.count_filtered);
                }
            }

            if traversal.limit_reached() {
                return Ok(());
            }
        }
        Ok(())
    }
}
