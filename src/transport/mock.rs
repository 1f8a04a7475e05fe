//! In-memory remote server used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{
    ChunkSink, Connector, Credentials, EntryKind, RemoteEntry, Transport, join_remote,
};
use crate::error::{Error, Result};

#[derive(Default)]
struct MockState {
    /// Directory path -> child names in listing order.
    children: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    typed_listing: bool,
    reject_login: bool,
    broken_files: HashSet<String>,
    failing_cwd: HashSet<String>,
    failing_lists: HashSet<String>,
    chunk_size: usize,
    connects: usize,
    quits: usize,
    retrievals: Vec<String>,
}

/// A fake server whose tree is built up front; clones share state so tests
/// can inspect counters after handing a clone to a `Session`.
#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<MockState>>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> Option<(String, String)> {
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent.to_string(), path[idx + 1..].to_string()))
}

impl MockServer {
    pub fn new() -> Self {
        let mut state = MockState {
            chunk_size: 4,
            ..MockState::default()
        };
        state.children.insert("/".to_string(), Vec::new());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn add_child(state: &mut MockState, path: &str) {
        let Some((parent, name)) = parent_of(path).filter(|(_, name)| !name.is_empty()) else {
            return;
        };
        if !state.children.contains_key(&parent) {
            Self::add_child(state, &parent);
            state.children.insert(parent.clone(), Vec::new());
        }
        let siblings = state.children.entry(parent).or_default();
        if !siblings.contains(&name) {
            siblings.push(name);
        }
    }

    pub fn dir(self, path: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let path = normalize(path);
            Self::add_child(&mut state, &path);
            state.children.entry(path).or_default();
        }
        self
    }

    pub fn file(self, path: &str, content: &[u8]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            Self::add_child(&mut state, path);
            state.files.insert(path.to_string(), content.to_vec());
        }
        self
    }

    /// Makes listings carry type facts, like an `MLSD` capable server.
    pub fn typed_listing(self) -> Self {
        self.state.lock().unwrap().typed_listing = true;
        self
    }

    pub fn reject_login(self) -> Self {
        self.state.lock().unwrap().reject_login = true;
        self
    }

    /// Makes retrieval of `path` fail after the first chunk.
    pub fn broken_file(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .broken_files
            .insert(path.to_string());
        self
    }

    /// Makes `CWD` into `path` fail at the control-channel level.
    pub fn fail_cwd(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_cwd.insert(normalize(path));
        self
    }

    /// Makes listing `path` fail at the control-channel level.
    pub fn fail_list(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(normalize(path));
        self
    }

    pub fn chunk_size(self, size: usize) -> Self {
        self.state.lock().unwrap().chunk_size = size;
        self
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn quits(&self) -> usize {
        self.state.lock().unwrap().quits
    }

    pub fn retrievals(&self) -> Vec<String> {
        self.state.lock().unwrap().retrievals.clone()
    }
}

impl Connector for MockServer {
    type Transport = MockTransport;

    fn connect(&self, _credentials: &Credentials) -> Result<MockTransport> {
        let mut state = self.state.lock().unwrap();
        if state.reject_login {
            return Err(Error::Connection {
                server: "mock".to_string(),
                message: "530 Login incorrect".to_string(),
            });
        }
        state.connects += 1;
        Ok(MockTransport {
            state: Arc::clone(&self.state),
            cwd: "/".to_string(),
        })
    }

    fn server(&self) -> &str {
        "mock"
    }
}

pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    cwd: String,
}

impl MockTransport {
    fn resolve(&self, path: &str) -> String {
        if path == "." {
            self.cwd.clone()
        } else if path.starts_with('/') {
            normalize(path)
        } else {
            normalize(&join_remote(&self.cwd, path))
        }
    }
}

impl Transport for MockTransport {
    fn change_dir(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        let state = self.state.lock().unwrap();
        if state.failing_cwd.contains(&target) {
            return Err(Error::Protocol(format!(
                "CWD {path} failed: 421 Service not available"
            )));
        }
        if state.children.contains_key(&target) {
            drop(state);
            self.cwd = target;
            Ok(())
        } else {
            Err(Error::Path {
                path: path.to_string(),
                message: "550 Failed to change directory".to_string(),
            })
        }
    }

    fn current_dir(&mut self) -> Result<String> {
        Ok(self.cwd.clone())
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>> {
        let state = self.state.lock().unwrap();
        if state.failing_lists.contains(&self.cwd) {
            return Err(Error::Protocol(format!(
                "MLSD {} failed: 425 Can't open data connection",
                self.cwd
            )));
        }
        let names = state.children.get(&self.cwd).cloned().unwrap_or_default();
        Ok(names
            .into_iter()
            .map(|name| {
                if state.typed_listing {
                    let kind = if state.children.contains_key(&join_remote(&self.cwd, &name)) {
                        EntryKind::Directory
                    } else {
                        EntryKind::File
                    };
                    RemoteEntry::typed(name, kind)
                } else {
                    RemoteEntry::untyped(name)
                }
            })
            .collect())
    }

    fn retrieve(&mut self, name: &str, sink: &mut ChunkSink<'_>) -> Result<u64> {
        let path = self.resolve(name);
        let (content, broken, chunk_size) = {
            let mut state = self.state.lock().unwrap();
            let Some(content) = state.files.get(&path).cloned() else {
                return Err(Error::Transfer {
                    file: name.to_string(),
                    message: "550 No such file".to_string(),
                });
            };
            state.retrievals.push(path.clone());
            (content, state.broken_files.contains(&path), state.chunk_size)
        };

        let mut total = 0u64;
        for chunk in content.chunks(chunk_size.max(1)) {
            sink(chunk).map_err(|e| Error::Transfer {
                file: name.to_string(),
                message: e.to_string(),
            })?;
            total += chunk.len() as u64;
            if broken {
                return Err(Error::Transfer {
                    file: name.to_string(),
                    message: "426 Connection closed; transfer aborted".to_string(),
                });
            }
        }
        Ok(total)
    }

    fn quit(&mut self) -> Result<()> {
        self.state.lock().unwrap().quits += 1;
        Ok(())
    }
}
