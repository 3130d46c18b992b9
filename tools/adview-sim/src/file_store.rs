use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use adview_core::error::StorageError;
use adview_core::store::StorageBackend;

/// localStorage stand-in: a flat JSON object on disk, rewritten on every
/// mutation.
pub struct FileBackend {
    path: PathBuf,
    items: RefCell<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open `path`, starting empty when it does not exist. A file that is not
    /// a JSON string map is treated as empty and overwritten on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            items: RefCell::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(&*self.items.borrow())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        fs::write(&self.path, json).map_err(io_error)
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self
            .items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush().inspect_err(|_| {
            let mut items = self.items.borrow_mut();
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.items.borrow_mut().remove(key).is_none() {
            return Ok(());
        }
        self.flush()
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

fn io_error(e: std::io::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}
