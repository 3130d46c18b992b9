use std::rc::Rc;

use adview_core::cache::{CachedApi, ResponseCache};
use adview_core::clock::Clock;
use adview_core::config::AppConfig;
use adview_core::controller::WatchController;
use adview_core::events::EventBus;
use adview_core::ledger::BalanceLedger;
use adview_core::profile::ProfileStore;
use adview_core::queue::AdQueue;
use adview_core::reward::{ClaimOutcome, RewardService};
use adview_core::store::{LocalStore, StorageBackend};
use adview_core::timer::{TimerEvent, WatchState, WatchTimer};
use adview_core::types::{Ad, AdType, UserProfile};
use embassy_futures::block_on;

use crate::offline::OfflineTransport;
use crate::SimError;

/// When the tab goes hidden and comes back during a native watch, in
/// milliseconds after opening the ad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityScript {
    pub hidden_at_ms: Option<u64>,
    pub visible_at_ms: Option<u64>,
}

#[derive(Debug)]
pub struct WatchReport {
    pub ad_id: String,
    /// Simulated time when the run stopped.
    pub elapsed_ms: u64,
    pub final_state: WatchState,
    pub events: Vec<TimerEvent>,
    /// Site opened by a redirect run.
    pub visited: Option<String>,
    pub outcome: Option<ClaimOutcome>,
}

/// Core services wired to a storage backend and the offline transport.
pub struct Session {
    pub config: AppConfig,
    pub profiles: ProfileStore,
    pub ledger: BalanceLedger,
    pub cache: ResponseCache,
    rewards: RewardService<OfflineTransport>,
}

impl Session {
    /// Build the services and make sure a profile for `email` exists.
    pub fn new(
        backend: impl StorageBackend + 'static,
        config: AppConfig,
        clock: Rc<dyn Clock>,
        email: &str,
    ) -> Self {
        let store = LocalStore::new(backend);
        let profiles = ProfileStore::new(store, EventBus::new());
        if profiles.load().is_none() {
            tracing::info!("Creating local profile for {}", email);
            profiles.save(&UserProfile::new(email));
        }
        let ledger = BalanceLedger::new(profiles.clone());
        ledger.cleanup();
        profiles.migrate_legacy_watched();

        let cache = ResponseCache::new(profiles.clone(), clock, config.cache.clone());
        let api = Rc::new(CachedApi::new(cache.clone(), OfflineTransport));
        let rewards = RewardService::new(
            profiles.clone(),
            ledger.clone(),
            api,
            config.auto_advance_delay_ms,
        );
        Self {
            config,
            profiles,
            ledger,
            cache,
            rewards,
        }
    }

    /// Ads ordered unwatched-first for the current profile.
    pub fn queue(&self, ads: Vec<Ad>) -> AdQueue {
        let mut queue = AdQueue::new(ads);
        queue.sort_unwatched_first(&self.profiles.watched_ads());
        queue
    }

    fn controller(&self, ads: Vec<Ad>, ad_id: &str, kind: AdType) -> Result<WatchController, SimError> {
        let ad = ads
            .iter()
            .find(|a| a.id == ad_id)
            .ok_or_else(|| SimError::UnknownAd(ad_id.to_string()))?;
        if ad.ad_type != kind {
            let name = match kind {
                AdType::Native => "native",
                AdType::Redirect => "redirect",
                AdType::Script => "script",
            };
            return Err(SimError::WrongKind(ad_id.to_string(), name));
        }
        let mut controller = WatchController::new(
            self.queue(ads),
            WatchTimer::from_config(&self.config),
            self.profiles.clone(),
        );
        controller.open(ad_id, 0);
        Ok(controller)
    }

    /// Watch a native ad on a scripted clock, then claim it.
    pub fn run_watch(
        &self,
        ads: Vec<Ad>,
        ad_id: &str,
        script: VisibilityScript,
    ) -> Result<WatchReport, SimError> {
        let mut controller = self.controller(ads, ad_id, AdType::Native)?;
        let step = self.config.tick_interval_ms.max(1);
        let hidden_span = match (script.hidden_at_ms, script.visible_at_ms) {
            (Some(h), Some(v)) => v.saturating_sub(h),
            _ => 0,
        };
        let limit = self.config.watch_duration_ms() + hidden_span + step;

        let mut events = Vec::new();
        let mut now = 0;
        let mut hidden = false;
        while controller.timer().needs_tick() || controller.timer().state() == WatchState::Paused {
            if now >= limit {
                break;
            }
            now += step;
            if !hidden && script.hidden_at_ms.is_some_and(|t| now >= t) {
                hidden = true;
                controller.on_visibility(false, now);
                tracing::info!("t={}ms tab hidden", now);
            }
            if hidden && script.visible_at_ms.is_some_and(|t| now >= t) {
                hidden = false;
                controller.on_visibility(true, now);
                tracing::info!("t={}ms tab visible", now);
            }
            if let Some(event) = controller.tick(now) {
                events.push(event);
            }
        }

        let outcome = self.claim_if_ready(&mut controller)?;
        Ok(WatchReport {
            ad_id: ad_id.to_string(),
            elapsed_ms: now,
            final_state: controller.timer().state(),
            events,
            visited: None,
            outcome,
        })
    }

    /// Click through a redirect ad and come back after `return_after_ms`.
    pub fn run_redirect(
        &self,
        ads: Vec<Ad>,
        ad_id: &str,
        return_after_ms: u64,
    ) -> Result<WatchReport, SimError> {
        let mut controller = self.controller(ads, ad_id, AdType::Redirect)?;
        let step = self.config.tick_interval_ms.max(1);

        let visited = controller.visit_site(0);
        let mut events = Vec::new();
        let mut now = 0;
        if visited.is_some() {
            controller.on_visibility(false, 0);
            while controller.timer().state() == WatchState::RedirectPending {
                if now >= return_after_ms {
                    if let Some(event) = controller.on_visibility(true, now) {
                        events.push(event);
                    }
                    break;
                }
                now = (now + step).min(return_after_ms);
                if let Some(event) = controller.tick(now) {
                    events.push(event);
                }
            }
        }

        let outcome = if events.contains(&TimerEvent::RedirectCompleted) {
            self.claim_if_ready(&mut controller)?
        } else {
            None
        };
        Ok(WatchReport {
            ad_id: ad_id.to_string(),
            elapsed_ms: now,
            final_state: controller.timer().state(),
            events,
            visited,
            outcome,
        })
    }

    fn claim_if_ready(
        &self,
        controller: &mut WatchController,
    ) -> Result<Option<ClaimOutcome>, SimError> {
        let Some(ad) = controller.claimable().cloned() else {
            return Ok(None);
        };
        let outcome = block_on(self.rewards.claim(&ad))?;
        controller.finish_claim(&outcome);
        Ok(Some(outcome))
    }
}
