use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::Backend;

/// Runtime configuration shared by all hosts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub default_backend: Backend,
    pub old_base_url: String,
    pub new_base_url: String,
    /// When set, every call goes through this same-origin proxy instead of a
    /// backend base URL.
    pub proxy_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub watch_duration_secs: u64,
    pub redirect_timeout_secs: u64,
    pub auto_advance_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub housekeeping_interval_secs: u64,
    pub cache: CacheTtls,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheTtls {
    pub default_secs: u64,
    /// Volatile lists (ads).
    pub short_secs: u64,
    pub profile_secs: u64,
    /// Rarely changing lists (regions, ad types).
    pub static_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            default_secs: 300,
            short_secs: 120,
            profile_secs: 600,
            static_secs: 3600,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_backend: Backend::Old,
            old_base_url: "http://localhost:5000/api".to_string(),
            new_base_url: "http://localhost:3000/dev".to_string(),
            proxy_endpoint: None,
            api_key: None,
            watch_duration_secs: 10,
            redirect_timeout_secs: 120,
            auto_advance_delay_ms: 1500,
            tick_interval_ms: 100,
            housekeeping_interval_secs: 300,
            cache: CacheTtls::default(),
        }
    }
}

impl AppConfig {
    /// Apply `ADVIEW_*` overrides from `lookup` on top of the defaults.
    /// Values that fail to parse are logged and skipped.
    pub fn from_env_values(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        try_load(&lookup, "ADVIEW_DEFAULT_BACKEND", &mut self.default_backend);
        try_load(&lookup, "ADVIEW_WATCH_DURATION_SECS", &mut self.watch_duration_secs);
        try_load(
            &lookup,
            "ADVIEW_REDIRECT_TIMEOUT_SECS",
            &mut self.redirect_timeout_secs,
        );
        if let Some(url) = non_empty(&lookup, "ADVIEW_OLD_BASE_URL") {
            self.old_base_url = url;
        }
        if let Some(url) = non_empty(&lookup, "ADVIEW_NEW_BASE_URL") {
            self.new_base_url = url;
        }
        if let Some(proxy) = non_empty(&lookup, "ADVIEW_PROXY_ENDPOINT") {
            self.proxy_endpoint = Some(proxy);
        }
        if let Some(key) = non_empty(&lookup, "ADVIEW_API_KEY") {
            self.api_key = Some(key);
        }
    }

    pub fn watch_duration_ms(&self) -> u64 {
        self.watch_duration_secs.saturating_mul(1000)
    }

    pub fn redirect_timeout_ms(&self) -> u64 {
        self.redirect_timeout_secs.saturating_mul(1000)
    }

    pub fn base_url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Old => &self.old_base_url,
            Backend::New => &self.new_base_url,
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T::Err: Display,
{
    let Some(raw) = non_empty(lookup, key) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *slot = v,
        Err(e) => tracing::warn!("Invalid {key} value {raw:?}: {e}, keeping default"),
    }
}
