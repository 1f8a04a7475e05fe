//! FTP transport backed by `suppaftp`.

use std::io::Read;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use super::{ChunkSink, Connector, Credentials, EntryKind, RemoteEntry, Transport};
use crate::config::{DownloadConfig, ListingMode};
use crate::error::{Error, Result};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Opens FTP control connections to one server.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    server: String,
    port: u16,
    listing: ListingMode,
}

impl FtpConnector {
    /// Creates a connector for `server:port`.
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            listing: ListingMode::Auto,
        }
    }

    /// Creates a connector from the server settings of a download config.
    #[must_use]
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.server.clone(), config.port).with_listing(config.listing)
    }

    /// Sets the listing strategy of the connections this connector opens.
    #[must_use]
    pub const fn with_listing(mut self, listing: ListingMode) -> Self {
        self.listing = listing;
        self
    }
}

impl Connector for FtpConnector {
    type Transport = FtpTransport;

    fn connect(&self, credentials: &Credentials) -> Result<FtpTransport> {
        let connection_error = |e: FtpError| Error::Connection {
            server: self.server.clone(),
            message: e.to_string(),
        };

        log::debug!("Connecting to {}:{}", self.server, self.port);
        let mut stream =
            FtpStream::connect((self.server.as_str(), self.port)).map_err(connection_error)?;
        stream
            .login(credentials.username.as_str(), credentials.password.as_str())
            .map_err(connection_error)?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(connection_error)?;
        log::info!("Logged in to {} as {}", self.server, credentials.username);

        Ok(FtpTransport {
            stream,
            use_mlsd: self.listing == ListingMode::Auto,
        })
    }

    fn server(&self) -> &str {
        &self.server
    }
}

/// A logged-in FTP control connection.
pub struct FtpTransport {
    stream: FtpStream,
    use_mlsd: bool,
}

impl FtpTransport {
    fn list_names(&mut self) -> Result<Vec<RemoteEntry>> {
        let names = self
            .stream
            .nlst(None)
            .map_err(|e| Error::Protocol(format!("NLST failed: {e}")))?;
        Ok(names
            .iter()
            .filter_map(|line| parse_nlst_line(line))
            .collect())
    }
}

impl Transport for FtpTransport {
    fn change_dir(&mut self, path: &str) -> Result<()> {
        match self.stream.cwd(path) {
            Ok(()) => Ok(()),
            Err(e @ FtpError::UnexpectedResponse(_)) => Err(Error::Path {
                path: path.to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(Error::Protocol(format!("CWD {path} failed: {e}"))),
        }
    }

    fn current_dir(&mut self) -> Result<String> {
        self.stream
            .pwd()
            .map_err(|e| Error::Protocol(format!("PWD failed: {e}")))
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>> {
        if !self.use_mlsd {
            return self.list_names();
        }
        match self.stream.mlsd(None) {
            Ok(lines) => Ok(lines
                .iter()
                .filter_map(|line| parse_mlsd_line(line))
                .collect()),
            Err(e @ FtpError::UnexpectedResponse(_)) => {
                log::debug!("MLSD refused ({e}), falling back to NLST");
                self.use_mlsd = false;
                self.list_names()
            }
            Err(e) => Err(Error::Protocol(format!("MLSD failed: {e}"))),
        }
    }

    fn retrieve(&mut self, name: &str, sink: &mut ChunkSink<'_>) -> Result<u64> {
        self.stream
            .retr(name, |reader: &mut dyn Read| {
                let mut buf = vec![0u8; READ_BUFFER_SIZE];
                let mut total = 0u64;
                loop {
                    let n = reader.read(&mut buf).map_err(FtpError::ConnectionError)?;
                    if n == 0 {
                        break;
                    }
                    sink(&buf[..n]).map_err(FtpError::ConnectionError)?;
                    total += n as u64;
                }
                Ok(total)
            })
            .map_err(|e| Error::Transfer {
                file: name.to_string(),
                message: e.to_string(),
            })
    }

    fn quit(&mut self) -> Result<()> {
        self.stream
            .quit()
            .map_err(|e| Error::Protocol(format!("QUIT failed: {e}")))
    }
}

/// Parses one `NLST` line, stripping any directory prefix the server adds.
fn parse_nlst_line(line: &str) -> Option<RemoteEntry> {
    let name = line.trim_end_matches(['\r', '\n']);
    let name = name.rsplit('/').next().unwrap_or(name);
    match name {
        "" | "." | ".." => None,
        _ => Some(RemoteEntry::untyped(name)),
    }
}

/// Parses one `MLSD` line (`type=file;size=12; name`).
///
/// The current and parent directory entries are dropped; unknown types
/// (links, devices) are left untyped so they get probed.
fn parse_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (facts, name) = line.split_once(' ')?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    let kind = facts
        .split(';')
        .filter_map(|fact| fact.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("type"))
        .map(|(_, value)| value.to_ascii_lowercase());

    match kind.as_deref() {
        Some("cdir" | "pdir") => None,
        Some("dir") => Some(RemoteEntry::typed(name, EntryKind::Directory)),
        Some("file") => Some(RemoteEntry::typed(name, EntryKind::File)),
        _ => Some(RemoteEntry::untyped(name)),
    }
}
