//! Configuration types for download operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default EBI FTP host serving EMPIAR data.
pub const EMPIAR_FTP_HOST: &str = "ftp.ebi.ac.uk";
/// Default EMPIAR REST endpoint for entry metadata.
pub const EMPIAR_API_URL: &str = "https://www.ebi.ac.uk/empiar/api/entry";
/// Remote directory holding the public EMPIAR entries.
pub const EMPIAR_REMOTE_ROOT: &str = "/empiar/world_availability/";

/// How remote directory entries are classified as files or directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// Use `MLSD` type facts when the server supports them, probing otherwise.
    #[default]
    Auto,
    /// Always list names only and probe each entry with `CWD`.
    Probe,
}

/// Configuration for download operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// FTP server host name.
    pub server: String,
    /// FTP control port.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// A progress event is emitted every time this many bytes have been received.
    pub progress_threshold: u64,
    /// Whether to remove `.part` files when a transfer fails.
    pub cleanup_on_error: bool,
    /// Whether files rejected by the filter consume the file-count limit.
    pub count_filtered: bool,
    /// Listing strategy.
    pub listing: ListingMode,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            server: EMPIAR_FTP_HOST.to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            progress_threshold: 100 * 1024 * 1024,
            cleanup_on_error: true,
            count_filtered: false,
            listing: ListingMode::Auto,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the FTP server host.
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Sets the FTP control port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the login credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the progress reporting threshold in bytes.
    #[must_use]
    pub const fn with_progress_threshold(mut self, bytes: u64) -> Self {
        self.progress_threshold = bytes;
        self
    }

    /// Sets whether to clean up `.part` files on transfer error.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }

    /// Sets whether filtered-out files count against the limit.
    #[must_use]
    pub const fn with_count_filtered(mut self, count: bool) -> Self {
        self.count_filtered = count;
        self
    }

    /// Sets the listing strategy.
    #[must_use]
    pub const fn with_listing(mut self, listing: ListingMode) -> Self {
        self.listing = listing;
        self
    }
}

/// EMPIAR service locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpiarConfig {
    /// Base URL of the entry metadata API.
    pub api_url: String,
    /// Remote directory containing one folder per entry.
    pub remote_root: String,
}

impl Default for EmpiarConfig {
    fn default() -> Self {
        Self {
            api_url: EMPIAR_API_URL.to_string(),
            remote_root: EMPIAR_REMOTE_ROOT.to_string(),
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory where downloaded entries are saved.
    pub download_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Transfer settings.
    pub download: DownloadConfig,
    /// Local paths.
    pub paths: PathConfig,
    /// EMPIAR endpoints.
    pub empiar: EmpiarConfig,
}

impl AppConfig {
    /// Returns the default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("empiar-dl")
            .join("config.toml")
    }

    /// Loads the configuration from [`AppConfig::default_path`], falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Loads the configuration from `path`, falling back to defaults when the
    /// file does not exist. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text)
            .map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
