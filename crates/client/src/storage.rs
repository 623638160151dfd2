//! Client-local persistent key-value state.
//!
//! A small JSON file standing in for browser local storage: the session
//! token, the theme preference, and the last good catalog snapshot live
//! here. Writes flush the whole map; the file is small and writes are rare.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Storage keys used by this crate.
pub const KEY_SESSION_ID: &str = "session_id";
pub const KEY_THEME: &str = "theme";
pub const KEY_CATALOG_SNAPSHOT: &str = "catalog_snapshot";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A JSON-file-backed string-to-value map.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    map: HashMap<String, serde_json::Value>,
}

impl LocalStore {
    /// Open the store at `path`, creating an empty one if the file is
    /// missing. A corrupt file is discarded with a warning rather than
    /// failing the whole client.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt state file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unreadable, starting empty");
                HashMap::new()
            }
        };
        Self { path, map }
    }

    /// Read and deserialize a value. `None` if the key is absent or the
    /// stored value no longer matches the expected shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.map.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "stored value has unexpected shape");
                None
            }
        }
    }

    /// Store a value and flush to disk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be serialized or the file
    /// cannot be written.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        self.map
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.flush()
    }

    /// Remove a key and flush to disk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file cannot be written.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.map.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.map)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}
