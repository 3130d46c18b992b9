//! Per-ad watch countdown.
//!
//! Time is always derived from clock readings: remaining time is the value
//! stored at the start of the current running segment minus the time elapsed
//! since that segment started. Nothing is decremented per tick, so throttled
//! or suspended hosts cannot make the countdown drift.

use crate::config::AppConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatchState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Claimed,
    Skipped,
    /// Redirect ad: the user was sent off-site and the clock runs while away.
    RedirectPending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// Full watch duration reached while the tab was visible.
    Completed,
    /// User came back from the redirect after the full dwell time; claim now.
    RedirectCompleted,
    /// User came back too early; the attempt was discarded.
    RedirectShortfall { elapsed_ms: u64, required_ms: u64 },
    /// User never came back before the safety timeout; the pending return
    /// listener is dropped and the ad is left claimable by hand.
    RedirectAbandoned,
}

#[derive(Clone, Debug)]
pub struct WatchTimer {
    duration_ms: u64,
    redirect_timeout_ms: u64,
    state: WatchState,
    /// Remaining time at the start of the current segment.
    stored_remaining_ms: u64,
    /// Last computed remaining time.
    remaining_ms: u64,
    segment_start_ms: Option<u64>,
    redirect_clicked_ms: Option<u64>,
}

impl WatchTimer {
    pub fn new(duration_ms: u64, redirect_timeout_ms: u64) -> Self {
        Self {
            duration_ms,
            redirect_timeout_ms,
            state: WatchState::Idle,
            stored_remaining_ms: duration_ms,
            remaining_ms: duration_ms,
            segment_start_ms: None,
            redirect_clicked_ms: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.watch_duration_ms(), config.redirect_timeout_ms())
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    /// `100 * (duration - remaining) / duration`, clamped to `[0, 100]`.
    /// Uses remaining milliseconds, not the rounded-up seconds shown to the
    /// user, so the bar moves smoothly between whole seconds.
    pub fn progress_percent(&self) -> f64 {
        if matches!(self.state, WatchState::Completed | WatchState::Claimed) {
            return 100.0;
        }
        if self.duration_ms == 0 {
            return 100.0;
        }
        let done = self.duration_ms.saturating_sub(self.remaining_ms) as f64;
        (100.0 * done / self.duration_ms as f64).clamp(0.0, 100.0)
    }

    /// Whether the host must keep its tick interval alive.
    pub fn needs_tick(&self) -> bool {
        matches!(self.state, WatchState::Running | WatchState::RedirectPending)
    }

    /// Whether the host must keep its visibility listener attached.
    pub fn listens_visibility(&self) -> bool {
        matches!(
            self.state,
            WatchState::Running | WatchState::Paused | WatchState::RedirectPending
        )
    }

    pub fn redirect_clicked_ms(&self) -> Option<u64> {
        self.redirect_clicked_ms
    }

    /// Back to `Idle` with a full countdown. Used on every teardown path.
    pub fn reset(&mut self) {
        self.state = WatchState::Idle;
        self.stored_remaining_ms = self.duration_ms;
        self.remaining_ms = self.duration_ms;
        self.segment_start_ms = None;
        self.redirect_clicked_ms = None;
    }

    /// Idle -> Running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state != WatchState::Idle {
            return false;
        }
        self.reset();
        self.state = WatchState::Running;
        self.segment_start_ms = Some(now_ms);
        true
    }

    /// Idle -> RedirectPending. The countdown starts immediately.
    pub fn begin_redirect(&mut self, now_ms: u64) -> bool {
        if self.state != WatchState::Idle {
            return false;
        }
        self.reset();
        self.state = WatchState::RedirectPending;
        self.segment_start_ms = Some(now_ms);
        self.redirect_clicked_ms = Some(now_ms);
        true
    }

    /// Show an ad whose reward was already collected.
    pub fn set_already_claimed(&mut self) {
        self.reset();
        self.state = WatchState::Claimed;
        self.remaining_ms = 0;
        self.stored_remaining_ms = 0;
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<TimerEvent> {
        match self.state {
            WatchState::Running => {
                self.recompute(now_ms);
                if self.remaining_ms == 0 {
                    self.complete();
                    return Some(TimerEvent::Completed);
                }
                None
            }
            WatchState::RedirectPending => {
                self.recompute(now_ms);
                let clicked = self.redirect_clicked_ms.unwrap_or(now_ms);
                if now_ms.saturating_sub(clicked) >= self.redirect_timeout_ms {
                    tracing::debug!("Redirect return listener timed out");
                    self.complete();
                    return Some(TimerEvent::RedirectAbandoned);
                }
                None
            }
            _ => None,
        }
    }

    /// Visibility-change signal from the host.
    pub fn on_visibility(&mut self, visible: bool, now_ms: u64) -> Option<TimerEvent> {
        match (self.state, visible) {
            (WatchState::Running, false) => {
                self.recompute(now_ms);
                self.stored_remaining_ms = self.remaining_ms;
                self.segment_start_ms = None;
                if self.remaining_ms == 0 {
                    self.complete();
                    return Some(TimerEvent::Completed);
                }
                self.state = WatchState::Paused;
                None
            }
            (WatchState::Paused, true) => {
                if self.stored_remaining_ms == 0 {
                    self.complete();
                    return Some(TimerEvent::Completed);
                }
                self.state = WatchState::Running;
                self.segment_start_ms = Some(now_ms);
                None
            }
            (WatchState::RedirectPending, true) => {
                let clicked = self.redirect_clicked_ms.unwrap_or(now_ms);
                let elapsed_ms = now_ms.saturating_sub(clicked);
                if elapsed_ms >= self.duration_ms {
                    self.complete();
                    Some(TimerEvent::RedirectCompleted)
                } else {
                    self.reset();
                    Some(TimerEvent::RedirectShortfall {
                        elapsed_ms,
                        required_ms: self.duration_ms,
                    })
                }
            }
            _ => None,
        }
    }

    /// Completed -> Claimed.
    pub fn mark_claimed(&mut self) -> bool {
        if self.state != WatchState::Completed {
            return false;
        }
        self.state = WatchState::Claimed;
        true
    }

    /// Completed -> Skipped.
    pub fn skip(&mut self) -> bool {
        if self.state != WatchState::Completed {
            return false;
        }
        self.state = WatchState::Skipped;
        true
    }

    fn recompute(&mut self, now_ms: u64) {
        if let Some(start) = self.segment_start_ms {
            let elapsed = now_ms.saturating_sub(start);
            self.remaining_ms = self.stored_remaining_ms.saturating_sub(elapsed);
        }
    }

    fn complete(&mut self) {
        self.state = WatchState::Completed;
        self.remaining_ms = 0;
        self.stored_remaining_ms = 0;
        self.segment_start_ms = None;
        self.redirect_clicked_ms = None;
    }
}
