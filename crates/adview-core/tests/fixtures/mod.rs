#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use adview_core::api::{ApiAction, ApiTransport, CallOptions};
use adview_core::cache::{CachedApi, ResponseCache};
use adview_core::clock::ManualClock;
use adview_core::config::AppConfig;
use adview_core::error::ApiError;
use adview_core::events::EventBus;
use adview_core::ledger::BalanceLedger;
use adview_core::profile::ProfileStore;
use adview_core::store::{LocalStore, MemoryBackend};
use adview_core::types::{Ad, AdType, UserProfile};
use serde_json::Value;

/// Everything wired over one in-memory backend and one manual wall clock.
pub struct Harness {
    pub backend: Rc<MemoryBackend>,
    pub store: LocalStore,
    pub events: EventBus,
    pub profiles: ProfileStore,
    pub clock: ManualClock,
    pub cache: ResponseCache,
    pub ledger: BalanceLedger,
    pub config: AppConfig,
}

impl Harness {
    pub fn new() -> Self {
        let backend = Rc::new(MemoryBackend::new());
        let store = LocalStore::new(backend.clone());
        let events = EventBus::new();
        let profiles = ProfileStore::new(store.clone(), events.clone());
        let clock = ManualClock::new(1_700_000_000_000);
        let config = AppConfig::default();
        let cache = ResponseCache::new(profiles.clone(), Rc::new(clock.clone()), config.cache.clone());
        let ledger = BalanceLedger::new(profiles.clone());
        Self {
            backend,
            store,
            events,
            profiles,
            clock,
            cache,
            ledger,
            config,
        }
    }

    /// Harness with a saved profile for `email` holding `balance`.
    pub fn with_user(email: &str, balance: f64) -> Self {
        let h = Self::new();
        let mut profile = UserProfile::new(email);
        profile.balance = Some(balance);
        assert!(h.profiles.save(&profile));
        h
    }

    pub fn switch_user(&self, email: &str) {
        let mut profile = self.profiles.load().unwrap_or_default();
        profile.email = email.to_string();
        assert!(self.profiles.save(&profile));
    }

    pub fn api(&self, transport: Rc<ScriptedTransport>) -> Rc<CachedApi<Rc<ScriptedTransport>>> {
        Rc::new(CachedApi::new(self.cache.clone(), transport))
    }
}

/// Transport answering from a per-action script; unscripted actions fail with
/// a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<HashMap<ApiAction, Result<Value, ApiError>>>,
    calls: RefCell<Vec<(ApiAction, CallOptions)>>,
}

impl ScriptedTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn respond(&self, action: ApiAction, response: Result<Value, ApiError>) {
        self.responses.borrow_mut().insert(action, response);
    }

    pub fn calls(&self) -> Vec<ApiAction> {
        self.calls.borrow().iter().map(|(a, _)| *a).collect()
    }

    pub fn call_count(&self, action: ApiAction) -> usize {
        self.calls.borrow().iter().filter(|(a, _)| *a == action).count()
    }

    pub fn last_options(&self, action: ApiAction) -> Option<CallOptions> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(a, _)| *a == action)
            .map(|(_, o)| o.clone())
    }
}

impl ApiTransport for ScriptedTransport {
    async fn call(&self, action: ApiAction, options: &CallOptions) -> Result<Value, ApiError> {
        self.calls.borrow_mut().push((action, options.clone()));
        self.responses
            .borrow()
            .get(&action)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Network("offline".to_string())))
    }
}

pub fn ad(id: &str, reward: f64) -> Ad {
    Ad {
        id: id.to_string(),
        title: format!("Ad {id}"),
        description: String::new(),
        image_url: String::new(),
        region: "global".to_string(),
        ad_type: AdType::Native,
        redirection_link: None,
        reward_per_view: reward,
        budget: 100.0,
        view_count: 0,
    }
}

pub fn redirect_ad(id: &str, reward: f64) -> Ad {
    Ad {
        ad_type: AdType::Redirect,
        redirection_link: Some(format!("https://example.com/{id}")),
        ..ad(id, reward)
    }
}
