use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use adview_core::api::{ApiAction, CallOptions};
use adview_core::cache::{CachedApi, ResponseCache};
use adview_core::clock::Clock;
use adview_core::config::AppConfig;
use adview_core::controller::WatchController;
use adview_core::events::{AppEvent, EventBus, Subscription};
use adview_core::ledger::BalanceLedger;
use adview_core::profile::ProfileStore;
use adview_core::queue::{AdQueue, SortOrder};
use adview_core::reward::RewardService;
use adview_core::store::LocalStore;
use adview_core::timer::WatchTimer;
use adview_core::types::{Ad, UserProfile};
use dioxus::prelude::*;

use crate::api::fetch::FetchTransport;
use crate::clock::{PerfClock, WallClock};
use crate::state::{
    ADS, BACKEND, CONNECTED, DARK_MODE, LOADING, LOAD_ERROR, PROFILE, SORT_ORDER,
};
use crate::storage::BrowserStorage;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static SERVICES: RefCell<Option<Rc<Services>>> = const { RefCell::new(None) };
}

/// Everything the views talk to, built once in [`init`].
pub struct Services {
    pub config: AppConfig,
    pub profiles: ProfileStore,
    pub cache: ResponseCache,
    pub api: Rc<CachedApi<FetchTransport>>,
    pub rewards: RewardService<FetchTransport>,
    pub watch: RefCell<WatchController>,
    clock: PerfClock,
    _subscriptions: Vec<Subscription>,
}

impl Services {
    /// Monotonic milliseconds for the watch timer.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

pub fn services() -> Option<Rc<Services>> {
    SERVICES.with(|s| s.borrow().clone())
}

/// Run `f` against the services bundle. Logs and does nothing before `init`.
pub fn with_services<R>(f: impl FnOnce(&Services) -> R) -> Option<R> {
    match services() {
        Some(svc) => Some(f(&svc)),
        None => {
            tracing::warn!("Services used before init");
            None
        }
    }
}

/// Build-time `ADVIEW_*` overrides.
fn build_env(key: &str) -> Option<String> {
    let value = match key {
        "ADVIEW_DEFAULT_BACKEND" => option_env!("ADVIEW_DEFAULT_BACKEND"),
        "ADVIEW_OLD_BASE_URL" => option_env!("ADVIEW_OLD_BASE_URL"),
        "ADVIEW_NEW_BASE_URL" => option_env!("ADVIEW_NEW_BASE_URL"),
        "ADVIEW_PROXY_ENDPOINT" => option_env!("ADVIEW_PROXY_ENDPOINT"),
        "ADVIEW_API_KEY" => option_env!("ADVIEW_API_KEY"),
        "ADVIEW_WATCH_DURATION_SECS" => option_env!("ADVIEW_WATCH_DURATION_SECS"),
        "ADVIEW_REDIRECT_TIMEOUT_SECS" => option_env!("ADVIEW_REDIRECT_TIMEOUT_SECS"),
        _ => None,
    };
    value.map(str::to_string)
}

pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let config = AppConfig::from_env_values(build_env);
    tracing::info!(
        "Starting with backend {} (proxy: {})",
        config.default_backend,
        config.proxy_endpoint.as_deref().unwrap_or("none")
    );

    let store = LocalStore::new(BrowserStorage);
    if !store.is_available() {
        tracing::warn!("localStorage unavailable, state will not persist");
    }
    let events = EventBus::new();
    let profiles = ProfileStore::new(store, events.clone());

    // 1. Migrate old schemas before anything reads the profile
    let ledger = BalanceLedger::new(profiles.clone());
    ledger.cleanup();
    profiles.migrate_legacy_watched();

    let cache = ResponseCache::new(profiles.clone(), Rc::new(WallClock), config.cache.clone());
    let expired = cache.clear_expired();
    if expired > 0 {
        tracing::info!("Dropped {} expired cache entries", expired);
    }

    let api = Rc::new(CachedApi::new(
        cache.clone(),
        FetchTransport::new(config.clone()),
    ));
    let rewards = RewardService::new(
        profiles.clone(),
        ledger,
        api.clone(),
        config.auto_advance_delay_ms,
    );

    let watch = WatchController::new(
        AdQueue::new(Vec::new()),
        WatchTimer::from_config(&config),
        profiles.clone(),
    );

    // 2. Mirror profile changes into signals
    let subscription = events.subscribe(|event| {
        let profile = match event {
            AppEvent::ProfileUpdated { profile, .. } => profile,
            AppEvent::UserLoggedIn { profile, .. } => profile,
        };
        *PROFILE.write() = Some(profile.clone());
    });

    *PROFILE.write() = profiles.load();
    *DARK_MODE.write() = profiles.dark_mode();
    *BACKEND.write() = config.default_backend;

    let housekeeping_ms = config.housekeeping_interval_secs.saturating_mul(1000);
    let svc = Rc::new(Services {
        config,
        profiles,
        cache,
        api,
        rewards,
        watch: RefCell::new(watch),
        clock: PerfClock,
        _subscriptions: vec![subscription],
    });
    SERVICES.with(|s| *s.borrow_mut() = Some(svc));

    crate::watch::ticker::start_housekeeping(housekeeping_ms);

    // 3. Remote data; cached copies render first
    wasm_bindgen_futures::spawn_local(async {
        refresh_profile().await;
        load_ads(false).await;
    });
}

/// Fetch the ad list and push it into the queue.
pub async fn load_ads(force_refresh: bool) {
    let Some(svc) = services() else { return };
    *LOADING.write() = true;

    let result = svc
        .api
        .call(ApiAction::GetAds, CallOptions::new(), force_refresh)
        .await;
    match result {
        Ok(value) => {
            let ads = Ad::list_from_value(value);
            tracing::info!("Loaded {} ads", ads.len());
            let watched = svc.profiles.watched_ads();
            svc.watch.borrow_mut().replace_ads(ads, &watched);
            *LOAD_ERROR.write() = None;
            *CONNECTED.write() = true;
        }
        Err(e) => {
            tracing::warn!("Failed to load ads: {}", e);
            *LOAD_ERROR.write() = Some(e.user_message());
            *CONNECTED.write() = false;
        }
    }
    *LOADING.write() = false;
    crate::watch::publish_queue(&svc);
}

/// Merge the server profile into the local one when signed in.
pub async fn refresh_profile() {
    let Some(svc) = services() else { return };
    if svc.profiles.auth_token().is_none() {
        return;
    }
    match svc
        .api
        .call(ApiAction::GetProfile, CallOptions::new(), false)
        .await
    {
        Ok(value) => {
            let value = value.get("user").cloned().unwrap_or(value);
            match serde_json::from_value::<UserProfile>(value) {
                Ok(remote) => {
                    let merged = svc.profiles.merge_remote(remote);
                    *PROFILE.write() = Some(merged);
                }
                Err(e) => tracing::warn!("Unexpected profile shape: {}", e),
            }
        }
        Err(e) => tracing::debug!("Profile refresh failed: {}", e),
    }
}

pub fn set_sort_order(order: SortOrder) {
    with_services(|svc| {
        {
            let mut watch = svc.watch.borrow_mut();
            match order {
                SortOrder::Reward => watch.queue_mut().sort_by_reward(),
                SortOrder::UnwatchedFirst => {
                    let watched = svc.profiles.watched_ads();
                    watch.queue_mut().sort_unwatched_first(&watched);
                }
            }
        }
        *SORT_ORDER.write() = order;
        crate::watch::publish_queue(svc);
    });
}

pub fn toggle_dark_mode() {
    with_services(|svc| {
        let enabled = !svc.profiles.dark_mode();
        if !svc.profiles.set_dark_mode(enabled) {
            tracing::debug!("Dark mode preference not persisted");
        }
        *DARK_MODE.write() = enabled;
    });
}
