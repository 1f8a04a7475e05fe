//! empiar-dl - A library for downloading EMPIAR movie datasets over FTP.
//!
//! The core is a synchronous, filtered, resumable recursive folder
//! downloader that runs over one reusable FTP session per operation. The
//! EMPIAR metadata lookup and the command line front end are built on top.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use empiar_dl::{DownloadConfig, Downloader, Filter, NoProgress};
//!
//! # fn example() -> empiar_dl::Result<()> {
//! let mut downloader = Downloader::new(DownloadConfig::default(), Filter::new([".tif", ".tiff"]));
//!
//! let report = downloader.download_folder(
//!     "/empiar/world_availability/10200/data/Movies",
//!     Path::new("EMPIAR10200/data/Movies"),
//!     &NoProgress,
//!     Some(5),
//! )?;
//! println!("{} file(s) ready", report.files_ready);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod download;
pub mod entry;
pub mod error;
pub mod filter;
pub mod format;
pub mod fs;
pub mod plan;
pub mod session;
pub mod stats;
mod transfer;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{AppConfig, DownloadConfig, ListingMode};
pub use download::{DownloadProgress, Downloader, NoProgress, OnFileReady};
pub use entry::{EmpiarApi, EntryMetadata, EntryResolver};
pub use error::{Error, Result};
pub use filter::Filter;
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, StdFileSystem};
pub use plan::DownloadPlan;
pub use session::Session;
pub use stats::{FileOrigin, FileStats, ReadyFile, WalkReport};
pub use transport::ftp::FtpConnector;
pub use transport::{Connector, Credentials, EntryKind, RemoteEntry, Transport};
