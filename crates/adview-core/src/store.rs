use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Well-known storage keys.
pub mod keys {
    pub const AUTH_TOKEN: &str = "authToken";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_PROFILE: &str = "userProfile";
    /// Superseded by `userProfile.watched_ads`; read once for migration.
    pub const LEGACY_WATCHED_ADS: &str = "watchedAds";
    pub const DARK_MODE: &str = "DarkMode";
    pub const CACHE_PREFIX: &str = "cache_";
}

const PROBE_KEY: &str = "__adview_storage_probe__";

/// Raw string key-value storage, e.g. `window.localStorage`.
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Safe facade over a [`StorageBackend`]: no operation ever returns an error.
/// Failures are logged and turned into the caller's default or `false`.
#[derive(Clone)]
pub struct LocalStore {
    backend: Rc<dyn StorageBackend>,
}

impl LocalStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Rc::new(backend),
        }
    }

    pub fn from_rc(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        match self.backend.get_item(key) {
            Ok(Some(v)) => v,
            Ok(None) => default.to_string(),
            Err(e) => {
                tracing::warn!("Storage read of {} failed: {}", key, e);
                default.to_string()
            }
        }
    }

    /// Like [`get`](Self::get) but distinguishes a missing key.
    pub fn get_opt(&self, key: &str) -> Option<String> {
        match self.backend.get_item(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Storage read of {} failed: {}", key, e);
                None
            }
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_json_opt(key).unwrap_or(default)
    }

    pub fn get_json_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_opt(key)?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Stored value under {} is not valid JSON: {}", key, e);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> bool {
        match self.backend.set_item(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Storage write of {} failed: {}", key, e);
                false
            }
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, &json),
            Err(e) => {
                tracing::warn!("Could not serialize value for {}: {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.backend.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Storage remove of {} failed: {}", key, e);
                false
            }
        }
    }

    /// Probe with a throwaway write; private-mode and disabled storage fail here.
    pub fn is_available(&self) -> bool {
        let ok = self.backend.set_item(PROBE_KEY, "1").is_ok();
        let _ = self.backend.remove_item(PROBE_KEY);
        ok
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(prefix)).collect(),
            Err(e) => {
                tracing::warn!("Storage key scan failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// In-memory backend. Used by tests and as the fallback when the host has no
/// persistent storage.
#[derive(Default)]
pub struct MemoryBackend {
    items: RefCell<BTreeMap<String, String>>,
    failure: Cell<Option<FailureMode>>,
}

/// Injected failure for [`MemoryBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Reads succeed, writes fail with `QuotaExceeded`.
    QuotaExceeded,
    /// Everything fails with `Unavailable`.
    Unavailable,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, mode: Option<FailureMode>) {
        self.failure.set(mode);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn check_read(&self) -> Result<(), StorageError> {
        match self.failure.get() {
            Some(FailureMode::Unavailable) => Err(StorageError::Unavailable),
            _ => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), StorageError> {
        match self.failure.get() {
            Some(FailureMode::Unavailable) => Err(StorageError::Unavailable),
            Some(FailureMode::QuotaExceeded) => Err(StorageError::QuotaExceeded),
            None => Ok(()),
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_read()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_write()?;
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_write()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_read()?;
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Rc<B> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}
