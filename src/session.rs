//! Lazily established, reusable control connection.

use crate::error::Result;
use crate::transport::{Connector, Credentials, Transport};

/// One control connection to a remote server, opened on first use and
/// reused until [`Session::close`].
///
/// The session remembers the remote working directory so that repeated
/// `change_directory` calls to the same path cost nothing. A session serves
/// one sequential traversal and is not meant to be shared.
pub struct Session<C: Connector> {
    connector: C,
    credentials: Credentials,
    connection: Option<C::Transport>,
    cwd: Option<String>,
}

impl<C: Connector> Session<C> {
    /// Creates a session that will log in with `credentials`.
    pub const fn new(connector: C, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
            connection: None,
            cwd: None,
        }
    }

    /// Returns `true` while a connection is open.
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the live connection, connecting and logging in first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if connecting or logging in fails.
    /// Nothing is retried.
    pub fn connection(&mut self) -> Result<&mut C::Transport> {
        let transport = match self.connection.take() {
            Some(transport) => transport,
            None => {
                self.cwd = None;
                self.connector.connect(&self.credentials)?
            }
        };
        Ok(self.connection.insert(transport))
    }

    /// Changes the remote working directory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Path`] if the directory cannot be entered.
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        if self.cwd.as_deref() == Some(path) && self.connection.is_some() {
            return Ok(());
        }
        self.connection()?.change_dir(path)?;
        log::trace!("CWD {path}");
        self.cwd = Some(path.to_string());
        Ok(())
    }

    /// Returns the absolute remote working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot report it.
    pub fn current_dir(&mut self) -> Result<String> {
        let dir = self.connection()?.current_dir()?;
        self.cwd = Some(dir.clone());
        Ok(dir)
    }

    /// Sends `QUIT` and drops the connection. Does nothing if no connection is open.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge `QUIT`; the
    /// connection is dropped either way.
    pub fn close(&mut self) -> Result<()> {
        self.cwd = None;
        match self.connection.take() {
            Some(mut transport) => {
                log::debug!("Closing connection to {}", self.connector.server());
                transport.quit()
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transport::mock::MockServer;

    fn session(server: &MockServer) -> Session<MockServer> {
        Session::new(server.clone(), Credentials::default())
    }

    #[test]
    fn connects_lazily_and_once() {
        let server = MockServer::new().dir("/empiar/data");
        let mut session = session(&server);
        assert!(!session.is_connected());
        assert_eq!(server.connects(), 0);

        session.change_directory("/empiar").unwrap();
        session.change_directory("/empiar/data").unwrap();
        session.connection().unwrap();
        assert!(session.is_connected());
        assert_eq!(server.connects(), 1);
    }

    #[test]
    fn missing_directory_is_a_path_error() {
        let server = MockServer::new().dir("/empiar");
        let mut session = session(&server);
        let err = session.change_directory("/nowhere").unwrap_err();
        assert!(matches!(err, Error::Path { ref path, .. } if path == "/nowhere"));
    }

    #[test]
    fn failed_probe_keeps_previous_directory() {
        let server = MockServer::new().file("/empiar/a.mrc", b"x");
        let mut session = session(&server);
        session.change_directory("/empiar").unwrap();
        assert!(session.change_directory("/empiar/a.mrc").is_err());
        assert_eq!(session.current_dir().unwrap(), "/empiar");
    }

    #[test]
    fn rejected_login_is_a_connection_error() {
        let server = MockServer::new().reject_login();
        let mut session = session(&server);
        assert!(matches!(
            session.change_directory("/"),
            Err(Error::Connection { .. })
        ));
        assert!(!session.is_connected());
    }

    #[test]
    fn close_quits_once_and_reconnects_on_next_use() {
        let server = MockServer::new().dir("/empiar");
        let mut session = session(&server);
        session.change_directory("/empiar").unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(server.quits(), 1);
        assert!(!session.is_connected());

        session.change_directory("/empiar").unwrap();
        assert_eq!(server.connects(), 2);
    }
}
