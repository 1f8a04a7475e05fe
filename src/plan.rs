//! Where an entry's files come from and where they land.

use std::path::{Path, PathBuf};

use crate::config::EMPIAR_REMOTE_ROOT;
use crate::entry::EntryMetadata;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::transport::split_remote;

/// Movie file suffixes per EMPIAR data format label.
pub const DATA_FORMATS: &[(&str, &[&str])] = &[
    ("MRC", &[".mrc"]),
    ("MRCS", &[".mrcs"]),
    ("TIFF", &[".tif", ".tiff"]),
    ("DM4", &[".dm4"]),
    ("HDF5", &[".hdf"]),
];

/// Returns the movie suffixes known for `data_format`.
#[must_use]
pub fn format_suffixes(data_format: &str) -> &'static [&'static str] {
    DATA_FORMATS
        .iter()
        .find(|(label, _)| *label == data_format)
        .map_or(&[], |(_, suffixes)| suffixes)
}

/// Returns `true` if `path` carries a movie suffix of `data_format`.
///
/// Only the last extension is compared, so `movie.tif.jpg` is not a movie.
#[must_use]
pub fn is_movie(path: &Path, data_format: &str) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    format_suffixes(data_format)
        .iter()
        .any(|suffix| suffix.strip_prefix('.') == Some(ext))
}

/// A gain reference resolved to a remote file and a local folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GainTarget {
    /// Absolute remote path of the gain file.
    pub remote_file: String,
    /// Local folder the gain file is downloaded into.
    pub local_folder: PathBuf,
}

/// User choices for downloading one entry.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    /// Entry identifier, e.g. `10200`.
    pub entry_id: String,
    /// Base local directory.
    pub download_dir: PathBuf,
    /// Maximum number of movies; `None` downloads all of them.
    pub amount: Option<usize>,
    /// Extra suffixes to download besides the entry's movie format.
    pub extensions: Vec<String>,
    /// Whether files go under an `EMPIAR<id>` folder.
    pub make_entry_folder: bool,
    /// Full URL of a gain reference to fetch alongside the movies.
    pub gain_url: Option<String>,
    /// Remote directory containing one folder per entry.
    pub remote_root: String,
}

impl DownloadPlan {
    /// Creates a plan for `entry_id` with the defaults: entry folder on,
    /// no extra extensions, no gain, no limit.
    pub fn new(entry_id: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            entry_id: entry_id.into(),
            download_dir: download_dir.into(),
            amount: None,
            extensions: Vec::new(),
            make_entry_folder: true,
            gain_url: None,
            remote_root: EMPIAR_REMOTE_ROOT.to_string(),
        }
    }

    /// Local folder the entry is mirrored into.
    #[must_use]
    pub fn root_folder(&self) -> PathBuf {
        if self.make_entry_folder {
            self.download_dir.join(format!("EMPIAR{}", self.entry_id))
        } else {
            self.download_dir.clone()
        }
    }

    /// Remote folder holding the entry's movies.
    #[must_use]
    pub fn remote_images_dir(&self, meta: &EntryMetadata) -> String {
        let root = self.remote_root.trim_end_matches('/');
        let directory = meta.directory.trim_matches('/');
        if directory.is_empty() {
            format!("{root}/{}", self.entry_id)
        } else {
            format!("{root}/{}/{directory}", self.entry_id)
        }
    }

    /// Local folder the entry's movies are downloaded into.
    #[must_use]
    pub fn local_images_dir(&self, meta: &EntryMetadata) -> PathBuf {
        self.root_folder().join(meta.directory.trim_matches('/'))
    }

    /// Builds the download filter: the suffixes of `data_format` followed by
    /// the user's extra extensions.
    ///
    /// An unknown format with no extra extensions yields a filter that
    /// accepts every file.
    #[must_use]
    pub fn filter(&self, data_format: &str) -> Filter {
        let mut filter = Filter::new(format_suffixes(data_format).iter().copied());
        filter.extend(self.extensions.iter().map(|e| e.trim().to_string()));
        filter
    }

    /// Resolves [`DownloadPlan::gain_url`] against `server`.
    ///
    /// `http://ftp.ebi.ac.uk/empiar/world_availability/10200/data/Movies/Gain.mrc`
    /// gives the remote file `/empiar/world_availability/10200/data/Movies/Gain.mrc`
    /// and the local folder `<root_folder>/data/Movies`. Returns `Ok(None)`
    /// when no gain URL is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL does not point into this entry
    /// on `server`.
    pub fn gain_target(&self, server: &str) -> Result<Option<GainTarget>> {
        let Some(url) = self.gain_url.as_deref().map(str::trim) else {
            return Ok(None);
        };
        let invalid = |why: &str| Error::Config(format!("invalid gain URL {url}: {why}"));

        let (_, remote_file) = url
            .split_once(server)
            .ok_or_else(|| invalid(&format!("not on {server}")))?;
        if !remote_file.starts_with('/') {
            return Err(invalid("no path after the host"));
        }
        let (_, within_entry) = remote_file
            .split_once(&format!("/{}/", self.entry_id))
            .ok_or_else(|| invalid(&format!("not inside entry {}", self.entry_id)))?;
        let (folder, name) = split_remote(within_entry);
        if name.is_empty() {
            return Err(invalid("no file name"));
        }

        Ok(Some(GainTarget {
            remote_file: remote_file.to_string(),
            local_folder: self.root_folder().join(folder.trim_matches('/')),
        }))
    }
}
