use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Ads ---

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    #[default]
    Native,
    Redirect,
    Script,
}

/// A sponsored content record. Only `view_count` is ever mutated client-side,
/// and only as a mirror of the server counter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ad {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "type", default)]
    pub ad_type: AdType,
    #[serde(default, alias = "redirectionLink", skip_serializing_if = "Option::is_none")]
    pub redirection_link: Option<String>,
    #[serde(default, alias = "rewardPerView")]
    pub reward_per_view: f64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default, alias = "viewCount")]
    pub view_count: u64,
}

impl Ad {
    pub fn is_redirect(&self) -> bool {
        self.ad_type == AdType::Redirect
    }

    /// Ads from a list response, either a bare array or `{"ads": [...]}`.
    /// Records that do not parse are skipped.
    pub fn list_from_value(value: Value) -> Vec<Ad> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("ads").or_else(|| obj.remove("data")) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Ad>(item) {
                Ok(ad) => Some(ad),
                Err(e) => {
                    tracing::debug!("Skipping malformed ad record: {}", e);
                    None
                }
            })
            .collect()
    }
}

// --- User profile ---

/// Cached user profile. Persisted wholesale under `userProfile`; unknown
/// server fields survive in `extra` so an overwrite never drops them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default)]
    pub watched_ads: Vec<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Pre-`balance` schema field, migrated away by the ledger cleanup.
    #[serde(
        rename = "localBalance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_balance: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            balance: Some(0.0),
            ..Self::default()
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance.unwrap_or(0.0)
    }

    pub fn has_watched(&self, ad_id: &str) -> bool {
        self.watched_ads.iter().any(|id| id == ad_id)
    }
}

// --- Cache ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Expiry instant, wall-clock milliseconds.
    pub expires: u64,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub timestamp: u64,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires
    }

    pub fn is_valid_for(&self, user_id: &str, now_ms: u64) -> bool {
        !self.is_expired(now_ms) && self.user_id == user_id
    }
}
