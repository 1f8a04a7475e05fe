//! Remote file transport abstraction.
//!
//! The walker only needs a handful of control-channel operations, so the
//! transport is split into a [`Connector`] that establishes authenticated
//! connections and the [`Transport`] those connections implement. The FTP
//! implementation lives in [`ftp`]; tests use an in-memory server.

pub mod ftp;
#[cfg(test)]
pub(crate) mod mock;

use crate::error::Result;

/// Login credentials for a remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "anonymous".to_string(),
            password: String::new(),
        }
    }
}

/// Whether a remote entry is a directory or a plain file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A plain file.
    File,
    /// A directory that can be entered.
    Directory,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name relative to the listed directory.
    pub name: String,
    /// Entry type, when the listing carries it.
    pub kind: Option<EntryKind>,
}

impl RemoteEntry {
    /// An entry whose type has to be discovered by probing.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    /// An entry with a known type.
    pub fn typed(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
        }
    }
}

/// Receives the chunks of a retrieved file.
pub type ChunkSink<'a> = dyn FnMut(&[u8]) -> std::io::Result<()> + 'a;

/// An established, authenticated control connection.
pub trait Transport {
    /// Changes the remote working directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Path`] when the server refuses the directory
    /// and [`crate::Error::Protocol`] when the connection itself fails.
    fn change_dir(&mut self, path: &str) -> Result<()>;

    /// Returns the absolute remote working directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the server does not answer.
    fn current_dir(&mut self) -> Result<String>;

    /// Lists the working directory in server order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the listing fails.
    fn list(&mut self) -> Result<Vec<RemoteEntry>>;

    /// Streams a file of the working directory into `sink` in binary mode,
    /// returning the number of bytes received.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transfer`] if the stream or the sink fails.
    fn retrieve(&mut self, name: &str, sink: &mut ChunkSink<'_>) -> Result<u64>;

    /// Ends the session politely.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] if the server does not acknowledge.
    fn quit(&mut self) -> Result<()>;
}

/// Opens connections to one remote server.
pub trait Connector {
    /// Connection type produced by this connector.
    type Transport: Transport;

    /// Connects and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if either step fails.
    fn connect(&self, credentials: &Credentials) -> Result<Self::Transport>;

    /// Human-readable server name for logs and errors.
    fn server(&self) -> &str;
}

/// Joins a remote directory and an entry name with `/`.
#[must_use]
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Splits a remote file path into its directory and base name.
#[must_use]
pub fn split_remote(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}
