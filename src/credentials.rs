//! Persistent storage for the session's access token, refresh token and
//! last-known username.
//!
//! The three slots are written independently. Access and refresh are always
//! rewritten together, and the username is display data only, so a torn
//! write between slots is tolerated.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::models::TokenPair;

pub const ACCESS_KEY: &str = "teamboard_access";
pub const REFRESH_KEY: &str = "teamboard_refresh";
pub const USERNAME_KEY: &str = "teamboard_username";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential file io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is not valid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode credentials: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Durable string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Flat TOML table on disk. Every write rewrites the whole file; the
/// in-memory copy stays authoritative for reads.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                toml::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(FileStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string(entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Typed view over the three credential slots.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        CredentialStore { store }
    }

    pub fn in_memory() -> Self {
        CredentialStore::new(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self) -> TokenPair {
        TokenPair {
            access: self.store.get(ACCESS_KEY).unwrap_or_default(),
            refresh: self.store.get(REFRESH_KEY).unwrap_or_default(),
        }
    }

    pub fn set(&self, tokens: &TokenPair) {
        self.write(ACCESS_KEY, &tokens.access);
        self.write(REFRESH_KEY, &tokens.refresh);
    }

    pub fn set_access(&self, access: &str) {
        self.write(ACCESS_KEY, access);
    }

    pub fn username(&self) -> String {
        self.store.get(USERNAME_KEY).unwrap_or_default()
    }

    pub fn set_username(&self, username: &str) {
        self.write(USERNAME_KEY, username);
    }

    /// Drops every slot: tokens and username.
    pub fn clear(&self) {
        for key in [ACCESS_KEY, REFRESH_KEY, USERNAME_KEY] {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(key, error = %err, "Failed to remove credential");
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            tracing::warn!(key, error = %err, "Failed to persist credential");
        }
    }
}
