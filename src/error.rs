//! Error types for the empiar-dl library.

use thiserror::Error;

use crate::stats::WalkReport;

/// Errors that can occur while resolving or downloading an entry.
#[derive(Error, Debug)]
pub enum Error {
    /// The control connection could not be established or authenticated.
    #[error("cannot connect to {server}: {message}")]
    Connection {
        /// Server the session was opened against.
        server: String,
        /// Reason reported by the transport.
        message: String,
    },

    /// A remote directory cannot be entered.
    ///
    /// While classifying listing entries this is the normal signal that an
    /// entry is a plain file; anywhere else it is fatal.
    #[error("cannot enter remote directory {path}: {message}")]
    Path {
        /// Remote path that was rejected.
        path: String,
        /// Server reply.
        message: String,
    },

    /// Streaming a file's bytes failed.
    #[error("transfer of {file} failed: {message}")]
    Transfer {
        /// Remote file name.
        file: String,
        /// Reason reported by the transport or the local writer.
        message: String,
    },

    /// Any other control-channel failure (listing, PWD, QUIT).
    #[error("FTP protocol error: {0}")]
    Protocol(String),

    /// The entry has no multi-frame micrograph image set.
    #[error("EMPIAR entry {entry_id} does not have any movies")]
    NotFound {
        /// Requested entry identifier.
        entry_id: String,
    },

    /// The metadata document could not be interpreted.
    #[error("invalid entry metadata: {0}")]
    Metadata(String),

    /// Invalid configuration or command-line input.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error during local file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A traversal aborted after it had started.
    ///
    /// `report` holds everything completed before the failure.
    #[error("download interrupted after {} file(s): {source}", report.files_ready)]
    Interrupted {
        /// Progress made before the failure.
        report: Box<WalkReport>,
        /// The failure that stopped the traversal.
        source: Box<Error>,
    },
}

impl Error {
    /// Returns the innermost error, looking through [`Error::Interrupted`].
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Interrupted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A specialized `Result` type for empiar-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
