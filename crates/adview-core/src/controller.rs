use crate::profile::ProfileStore;
use crate::queue::AdQueue;
use crate::reward::ClaimOutcome;
use crate::timer::{TimerEvent, WatchState, WatchTimer};
use crate::types::{Ad, AdType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Escape,
    Other,
}

impl Key {
    pub fn from_code(code: &str) -> Self {
        match code {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Previous,
    Next,
    Close,
}

/// What the UI renders for the open ad.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchSnapshot {
    pub selected_ad_id: Option<String>,
    pub state: WatchState,
    pub remaining_secs: u64,
    pub progress_percent: f64,
    pub is_redirect_pending: bool,
}

/// Selected ad plus its watch timer. Every selection change tears the timer
/// down before re-arming it for the new ad, so nothing leaks across ads.
pub struct WatchController {
    queue: AdQueue,
    timer: WatchTimer,
    profiles: ProfileStore,
}

impl WatchController {
    pub fn new(queue: AdQueue, timer: WatchTimer, profiles: ProfileStore) -> Self {
        Self {
            queue,
            timer,
            profiles,
        }
    }

    pub fn queue(&self) -> &AdQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut AdQueue {
        &mut self.queue
    }

    pub fn timer(&self) -> &WatchTimer {
        &self.timer
    }

    pub fn current_ad(&self) -> Option<&Ad> {
        self.queue.current()
    }

    pub fn snapshot(&self) -> WatchSnapshot {
        WatchSnapshot {
            selected_ad_id: self.queue.current().map(|a| a.id.clone()),
            state: self.timer.state(),
            remaining_secs: self.timer.remaining_secs(),
            progress_percent: self.timer.progress_percent(),
            is_redirect_pending: self.timer.state() == WatchState::RedirectPending,
        }
    }

    pub fn open(&mut self, ad_id: &str, now_ms: u64) -> bool {
        self.timer.reset();
        if self.queue.select(ad_id).is_none() {
            return false;
        }
        self.arm(now_ms);
        true
    }

    pub fn close(&mut self) {
        self.timer.reset();
        self.queue.clear_selection();
    }

    pub fn next(&mut self, now_ms: u64) -> Option<&Ad> {
        self.timer.reset();
        self.queue.next()?;
        self.arm(now_ms);
        self.queue.current()
    }

    pub fn previous(&mut self, now_ms: u64) -> Option<&Ad> {
        self.timer.reset();
        self.queue.previous()?;
        self.arm(now_ms);
        self.queue.current()
    }

    /// Swap in a refreshed ad list. When the open ad is gone the timer is torn
    /// down with the selection.
    pub fn replace_ads(&mut self, ads: Vec<Ad>, watched: &[String]) {
        let had_selection = self.queue.current().is_some();
        self.queue.replace_ads(ads, watched);
        if had_selection && self.queue.current().is_none() {
            tracing::debug!("Open ad left the list, stopping its timer");
            self.timer.reset();
        }
    }

    /// Undo `visit_site` when the site never opened. Returns false when no
    /// redirect was pending.
    pub fn cancel_redirect(&mut self) -> bool {
        if self.timer.state() != WatchState::RedirectPending {
            return false;
        }
        self.timer.reset();
        true
    }

    /// Start the off-site dwell countdown. Returns the link to open.
    pub fn visit_site(&mut self, now_ms: u64) -> Option<String> {
        let ad = self.queue.current()?;
        if !ad.is_redirect() || self.profiles.is_watched(&ad.id) {
            return None;
        }
        let link = ad.redirection_link.clone()?;
        self.timer.begin_redirect(now_ms).then_some(link)
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<TimerEvent> {
        self.timer.tick(now_ms)
    }

    pub fn on_visibility(&mut self, visible: bool, now_ms: u64) -> Option<TimerEvent> {
        self.timer.on_visibility(visible, now_ms)
    }

    /// The open ad, if its watch has completed and it can be claimed.
    pub fn claimable(&self) -> Option<&Ad> {
        if self.timer.state() != WatchState::Completed {
            return None;
        }
        self.queue.current()
    }

    /// Record a successful claim: mirror the view count and mark the timer.
    pub fn finish_claim(&mut self, outcome: &ClaimOutcome) {
        self.queue.set_view_count(&outcome.ad_id, outcome.view_count);
        if self.queue.current().is_some_and(|a| a.id == outcome.ad_id) {
            self.timer.mark_claimed();
        }
    }

    pub fn skip(&mut self) -> bool {
        self.timer.skip()
    }

    pub fn handle_key(&mut self, key: Key, now_ms: u64) -> Option<KeyAction> {
        self.queue.current()?;
        let action = match key {
            Key::ArrowUp => KeyAction::Previous,
            Key::ArrowDown => KeyAction::Next,
            Key::Escape => KeyAction::Close,
            Key::Other => return None,
        };
        match action {
            KeyAction::Previous => {
                self.previous(now_ms);
            }
            KeyAction::Next => {
                self.next(now_ms);
            }
            KeyAction::Close => self.close(),
        }
        Some(action)
    }

    fn arm(&mut self, now_ms: u64) {
        let Some(ad) = self.queue.current() else {
            return;
        };
        if self.profiles.is_watched(&ad.id) {
            self.timer.set_already_claimed();
            return;
        }
        match ad.ad_type {
            AdType::Native => {
                self.timer.start(now_ms);
            }
            // Redirect ads wait for "visit site"; script ads are not part of
            // the reward flow.
            AdType::Redirect | AdType::Script => {}
        }
    }
}
