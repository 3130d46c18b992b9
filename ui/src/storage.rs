use adview_core::error::StorageError;
use adview_core::store::StorageBackend;
use wasm_bindgen::JsValue;

/// `window.localStorage`, looked up on every call so a storage that becomes
/// available (or goes away) mid-session is picked up.
#[derive(Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }
}

impl StorageBackend for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?.get_item(key).map_err(js_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage()?.remove_item(key).map_err(js_error)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let storage = self.storage()?;
        let len = storage.length().map_err(js_error)?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Some(key) = storage.key(i).map_err(js_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn js_error(err: JsValue) -> StorageError {
    let name = js_sys::Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
        .unwrap_or_default();
    match name.as_str() {
        "QuotaExceededError" | "NS_ERROR_DOM_QUOTA_REACHED" => StorageError::QuotaExceeded,
        "SecurityError" => StorageError::Unavailable,
        _ => StorageError::Backend(format!("{:?}", err)),
    }
}
