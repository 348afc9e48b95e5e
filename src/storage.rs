//! Durable storage for the session token.
//!
//! The session keeps exactly one entry: the bearer token, under a fixed key. Storage is
//! synchronous so that [`Session::logout`](crate::Session::logout) can stay synchronous.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::types::SessionToken;

/// Consumer-provided token persistence.
///
/// # Example
///
/// ```rust,ignore
/// struct Keyring;
///
/// impl TokenStore for Keyring {
///     fn load(&self) -> Result<Option<SessionToken>, Error> { /* ... */ }
///     fn save(&self, token: &SessionToken) -> Result<(), Error> { /* ... */ }
///     fn clear(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
pub trait TokenStore: Send + Sync + 'static {
    /// Read the persisted token, if any.
    fn load(&self) -> Result<Option<SessionToken>, Error>;

    /// Persist `token`, replacing any previous value.
    fn save(&self, token: &SessionToken) -> Result<(), Error>;

    /// Remove the persisted token. Removing an absent token is not an error.
    fn clear(&self) -> Result<(), Error>;
}

// Lets the caller keep a handle on a store it has given to a session.
impl<T: TokenStore> TokenStore for Arc<T> {
    fn load(&self) -> Result<Option<SessionToken>, Error> {
        (**self).load()
    }

    fn save(&self, token: &SessionToken) -> Result<(), Error> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), Error> {
        (**self).clear()
    }
}

/// Process-local store, mainly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<SessionToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already persisted, as if left over from a previous run.
    #[must_use]
    pub fn with_token(token: impl Into<SessionToken>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SessionToken>, Error> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &SessionToken) -> Result<(), Error> {
        *self.token.lock() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.token.lock().take();
        Ok(())
    }
}

/// Token entry in a JSON object file, written with restricted permissions (0600).
///
/// Other keys in the file are left alone, so several tools can share one file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

type Entries = BTreeMap<String, String>;

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Store the token under the entry named by [`ClientConfig::token_key`].
    #[must_use]
    pub fn from_config(path: impl Into<PathBuf>, config: &ClientConfig) -> Self {
        Self::new(path, config.token_key())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            Error::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)?;
        let write_err =
            |e: std::io::Error| Error::Storage(format!("failed to write {}: {e}", self.path.display()));

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SessionToken>, Error> {
        Ok(self
            .read_entries()?
            .remove(&self.key)
            .filter(|t| !t.is_empty())
            .map(SessionToken::from))
    }

    fn save(&self, token: &SessionToken) -> Result<(), Error> {
        // A corrupt file is replaced rather than blocking login.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), token.as_str().to_owned());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), Error> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(&self.key);
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Storage(format!(
                    "failed to remove {}: {e}",
                    self.path.display()
                ))),
            };
        }
        self.write_entries(&entries)
    }
}
