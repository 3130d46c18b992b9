use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::api::{cache_key, ApiAction, ApiTransport, CallOptions};
use crate::clock::Clock;
use crate::config::CacheTtls;
use crate::error::ApiError;
use crate::profile::ProfileStore;
use crate::store::{keys, LocalStore};
use crate::types::CacheEntry;

/// User-scoped response cache over [`LocalStore`].
///
/// Entries live under `cache_<userId>_<logicalKey>` and carry their own expiry.
/// Expired entries are evicted lazily on read; [`clear_expired`] is optional
/// housekeeping.
///
/// [`clear_expired`]: ResponseCache::clear_expired
#[derive(Clone)]
pub struct ResponseCache {
    store: LocalStore,
    profile: ProfileStore,
    clock: Rc<dyn Clock>,
    ttls: CacheTtls,
}

impl ResponseCache {
    pub fn new(profile: ProfileStore, clock: Rc<dyn Clock>, ttls: CacheTtls) -> Self {
        Self {
            store: profile.store().clone(),
            profile,
            clock,
            ttls,
        }
    }

    fn storage_key(user_id: &str, key: &str) -> String {
        format!("{}{}_{}", keys::CACHE_PREFIX, user_id, key)
    }

    /// Default TTL for a logical key, in milliseconds. The key's action name
    /// (text before any `?`) selects the volatility class.
    pub fn default_ttl_ms(&self, key: &str) -> u64 {
        let action = key.split('?').next().unwrap_or(key);
        let secs = match ApiAction::ALL.iter().find(|a| a.as_str() == action) {
            Some(ApiAction::GetAds) => self.ttls.short_secs,
            Some(ApiAction::GetProfile) => self.ttls.profile_secs,
            Some(ApiAction::GetRegions) | Some(ApiAction::GetAdTypes) => self.ttls.static_secs,
            _ => self.ttls.default_secs,
        };
        secs.saturating_mul(1000)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl_ms: Option<u64>) -> bool {
        let data = match serde_json::to_value(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Cannot cache {}: {}", key, e);
                return false;
            }
        };
        let user_id = self.profile.current_user_id();
        let now = self.clock.now_ms();
        let ttl = ttl_ms.unwrap_or_else(|| self.default_ttl_ms(key));
        let entry = CacheEntry {
            data,
            expires: now.saturating_add(ttl),
            user_id: user_id.clone(),
            timestamp: now,
        };
        self.store
            .set_json(&Self::storage_key(&user_id, key), &entry)
    }

    /// Cached data for `key`, or `None` when absent, expired (the entry is then
    /// deleted) or owned by a different user than the current one.
    pub fn get(&self, key: &str, user_id: Option<&str>) -> Option<Value> {
        let current = self.profile.current_user_id();
        let owner = user_id.unwrap_or(&current);
        let storage_key = Self::storage_key(owner, key);
        let entry: CacheEntry<Value> = self.store.get_json_opt(&storage_key)?;
        let now = self.clock.now_ms();
        if entry.is_expired(now) {
            tracing::debug!("Cache entry {} expired, evicting", key);
            self.store.remove(&storage_key);
            return None;
        }
        entry.is_valid_for(&current, now).then_some(entry.data)
    }

    /// Raw entry for the current user, ignoring expiry and without evicting.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<Value>> {
        let current = self.profile.current_user_id();
        let entry: CacheEntry<Value> = self
            .store
            .get_json_opt(&Self::storage_key(&current, key))?;
        (entry.user_id == current).then_some(entry)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let user_id = self.profile.current_user_id();
        self.store.remove(&Self::storage_key(&user_id, key))
    }

    pub fn remove(&self, key: &str) -> bool {
        self.invalidate(key)
    }

    /// Drop every entry for `action`, with or without params.
    pub fn invalidate_action(&self, action: ApiAction) -> usize {
        let user_id = self.profile.current_user_id();
        let exact = Self::storage_key(&user_id, action.as_str());
        let with_params = format!("{exact}?");
        let mut removed = 0;
        for key in self.store.keys_with_prefix(&exact) {
            if (key == exact || key.starts_with(&with_params)) && self.store.remove(&key) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove all entries belonging to `user_id` (default: current user).
    pub fn clear_user_cache(&self, user_id: Option<&str>) -> usize {
        let user_id = user_id
            .map(str::to_string)
            .unwrap_or_else(|| self.profile.current_user_id());
        let prefix = format!("{}{}_", keys::CACHE_PREFIX, user_id);
        let mut removed = 0;
        for key in self.store.keys_with_prefix(&prefix) {
            // Prefix alone is ambiguous when user ids contain '_'.
            let owned = self
                .store
                .get_json_opt::<CacheEntry<Value>>(&key)
                .is_none_or(|e| e.user_id == user_id);
            if owned && self.store.remove(&key) {
                removed += 1;
            }
        }
        tracing::info!("Cleared {} cache entries for {}", removed, user_id);
        removed
    }

    /// Full scan removing expired or unreadable entries of every user.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        for key in self.store.keys_with_prefix(keys::CACHE_PREFIX) {
            let stale = self
                .store
                .get_json_opt::<CacheEntry<Value>>(&key)
                .is_none_or(|e| e.is_expired(now));
            if stale && self.store.remove(&key) {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Housekeeping removed {} expired cache entries", removed);
        }
        removed
    }
}

/// Read-through cache in front of an [`ApiTransport`].
pub struct CachedApi<T> {
    cache: ResponseCache,
    transport: T,
}

impl<T: ApiTransport> CachedApi<T> {
    pub fn new(cache: ResponseCache, transport: T) -> Self {
        Self { cache, transport }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Serve from cache when possible, otherwise call through.
    ///
    /// Writes are never cached and drop the read keys they affect. When the
    /// transport fails, any entry still in storage for the current user is
    /// returned instead, expired or not.
    pub async fn call(
        &self,
        action: ApiAction,
        options: CallOptions,
        force_refresh: bool,
    ) -> Result<Value, ApiError> {
        let mut options = options;
        if options.token.is_none() && action.requires_auth() {
            options.token = self.cache.profile.auth_token();
        }

        let key = cache_key(action, &options);
        let cacheable = action.is_cacheable();
        let fallback = if cacheable { self.cache.peek(&key) } else { None };

        if cacheable && !force_refresh {
            if let Some(hit) = self.cache.get(&key, None) {
                tracing::debug!("Cache hit for {}", key);
                return Ok(hit);
            }
        }

        match self.transport.call(action, &options).await {
            Ok(value) => {
                if cacheable {
                    self.cache.set(&key, &value, None);
                }
                for read in action.invalidates() {
                    self.cache.invalidate_action(*read);
                }
                Ok(value)
            }
            Err(e) => match fallback {
                Some(entry) => {
                    tracing::warn!("{} failed ({}), serving cached copy", action, e);
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }
}
