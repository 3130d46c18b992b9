use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;

/// Which backend an action goes to.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Legacy REST service.
    #[default]
    Old,
    /// Cognito-backed service.
    New,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Old => "old",
            Backend::New => "new",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "old" => Ok(Backend::Old),
            "new" => Ok(Backend::New),
            other => Err(format!("unknown backend '{other}', expected 'old' or 'new'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Every remote operation the client performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiAction {
    Login,
    Register,
    VerifyEmail,
    GetProfile,
    UpdateProfile,
    GetAds,
    GetRegions,
    GetAdTypes,
    CreateAd,
    UpdateAd,
    DeleteAd,
    UploadImage,
    UpdateBalance,
    IncrementViewCount,
}

impl ApiAction {
    pub const ALL: [ApiAction; 14] = [
        ApiAction::Login,
        ApiAction::Register,
        ApiAction::VerifyEmail,
        ApiAction::GetProfile,
        ApiAction::UpdateProfile,
        ApiAction::GetAds,
        ApiAction::GetRegions,
        ApiAction::GetAdTypes,
        ApiAction::CreateAd,
        ApiAction::UpdateAd,
        ApiAction::DeleteAd,
        ApiAction::UploadImage,
        ApiAction::UpdateBalance,
        ApiAction::IncrementViewCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApiAction::Login => "login",
            ApiAction::Register => "register",
            ApiAction::VerifyEmail => "verifyEmail",
            ApiAction::GetProfile => "getProfile",
            ApiAction::UpdateProfile => "updateProfile",
            ApiAction::GetAds => "getAds",
            ApiAction::GetRegions => "getRegions",
            ApiAction::GetAdTypes => "getAdTypes",
            ApiAction::CreateAd => "createAd",
            ApiAction::UpdateAd => "updateAd",
            ApiAction::DeleteAd => "deleteAd",
            ApiAction::UploadImage => "uploadImage",
            ApiAction::UpdateBalance => "updateBalance",
            ApiAction::IncrementViewCount => "incrementViewCount",
        }
    }

    pub fn method(self) -> Method {
        match self {
            ApiAction::GetProfile
            | ApiAction::GetAds
            | ApiAction::GetRegions
            | ApiAction::GetAdTypes => Method::Get,
            ApiAction::UpdateProfile | ApiAction::UpdateAd => Method::Put,
            ApiAction::DeleteAd => Method::Delete,
            _ => Method::Post,
        }
    }

    /// Path template; `{name}` segments are filled from `CallOptions::params`.
    pub fn path(self) -> &'static str {
        match self {
            ApiAction::Login => "/auth/login",
            ApiAction::Register => "/auth/register",
            ApiAction::VerifyEmail => "/auth/verify",
            ApiAction::GetProfile | ApiAction::UpdateProfile => "/user/profile",
            ApiAction::GetAds | ApiAction::CreateAd => "/ads",
            ApiAction::GetRegions => "/regions",
            ApiAction::GetAdTypes => "/ads/types",
            ApiAction::UpdateAd | ApiAction::DeleteAd => "/ads/{id}",
            ApiAction::UploadImage => "/upload",
            ApiAction::UpdateBalance => "/user/balance",
            ApiAction::IncrementViewCount => "/ads/{id}/view",
        }
    }

    /// Backend pinned by the action, or `None` when the environment flag
    /// (`AppConfig::default_backend`) decides.
    pub fn fixed_backend(self) -> Option<Backend> {
        match self {
            ApiAction::Login | ApiAction::Register | ApiAction::VerifyEmail => Some(Backend::New),
            ApiAction::GetAds
            | ApiAction::GetRegions
            | ApiAction::GetAdTypes
            | ApiAction::UpdateAd
            | ApiAction::DeleteAd
            | ApiAction::UploadImage
            | ApiAction::IncrementViewCount => Some(Backend::Old),
            ApiAction::GetProfile
            | ApiAction::UpdateProfile
            | ApiAction::CreateAd
            | ApiAction::UpdateBalance => None,
        }
    }

    pub fn requires_auth(self) -> bool {
        !matches!(
            self,
            ApiAction::Login
                | ApiAction::Register
                | ApiAction::VerifyEmail
                | ApiAction::GetRegions
                | ApiAction::GetAdTypes
        )
    }

    /// Reads only. Writes are never cached.
    pub fn is_cacheable(self) -> bool {
        matches!(
            self,
            ApiAction::GetProfile | ApiAction::GetAds | ApiAction::GetRegions | ApiAction::GetAdTypes
        )
    }

    /// Read keys to drop after a successful write.
    pub fn invalidates(self) -> &'static [ApiAction] {
        match self {
            ApiAction::UpdateProfile | ApiAction::UpdateBalance => &[ApiAction::GetProfile],
            ApiAction::CreateAd => &[ApiAction::GetAds, ApiAction::GetProfile],
            ApiAction::UpdateAd | ApiAction::DeleteAd | ApiAction::IncrementViewCount => {
                &[ApiAction::GetAds]
            }
            ApiAction::Login => &[ApiAction::GetProfile],
            _ => &[],
        }
    }
}

impl fmt::Display for ApiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallOptions {
    /// Overrides the action's backend.
    pub base: Option<Backend>,
    pub params: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub token: Option<String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base(mut self, base: Backend) -> Self {
        self.base = Some(base);
        self
    }
}

/// Logical cache key: the action name, plus sorted params when present.
pub fn cache_key(action: ApiAction, options: &CallOptions) -> String {
    if options.params.is_empty() {
        return action.as_str().to_string();
    }
    let query: Vec<String> = options
        .params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    format!("{}?{}", action.as_str(), query.join("&"))
}

/// Performs one remote call. Implemented over `fetch` in the browser.
#[allow(async_fn_in_trait)]
pub trait ApiTransport {
    async fn call(&self, action: ApiAction, options: &CallOptions) -> Result<Value, ApiError>;
}

impl<T: ApiTransport> ApiTransport for Rc<T> {
    async fn call(&self, action: ApiAction, options: &CallOptions) -> Result<Value, ApiError> {
        (**self).call(action, options).await
    }
}

/// Fully resolved HTTP request for an action.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestPlan {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestPlan {
    pub fn build(action: ApiAction, options: &CallOptions, config: &AppConfig) -> Self {
        let backend = options
            .base
            .or(action.fixed_backend())
            .unwrap_or(config.default_backend);

        let (path, query) = fill_path(action.path(), &options.params);
        let url = match &config.proxy_endpoint {
            Some(proxy) => {
                let target = if query.is_empty() {
                    path
                } else {
                    format!("{path}?{query}")
                };
                format!(
                    "{}?base={}&path={}",
                    proxy,
                    backend,
                    encode_component(&target)
                )
            }
            None => {
                let base = config.base_url(backend).trim_end_matches('/');
                if query.is_empty() {
                    format!("{base}{path}")
                } else {
                    format!("{base}{path}?{query}")
                }
            }
        };

        let mut headers = Vec::new();
        if options.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if action.requires_auth() {
            if let Some(token) = &options.token {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }
        if backend == Backend::New {
            if let Some(key) = &config.api_key {
                headers.push(("x-api-key".to_string(), key.clone()));
            }
        }

        Self {
            method: action.method(),
            url,
            headers,
            body: options.body.as_ref().map(Value::to_string),
        }
    }
}

/// Substitute `{name}` segments; params not used in the path become the query.
fn fill_path(template: &str, params: &BTreeMap<String, String>) -> (String, String) {
    let mut path = template.to_string();
    let mut query = Vec::new();
    for (k, v) in params {
        let placeholder = format!("{{{k}}}");
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, &encode_component(v));
        } else {
            query.push(format!("{}={}", encode_component(k), encode_component(v)));
        }
    }
    (path, query.join("&"))
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
