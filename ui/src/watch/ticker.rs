use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::VisibilityState;

use crate::services::with_services;

/// Browser handles owned by the watch timer. Closures are created once and
/// reused so a callback never drops itself while running.
#[derive(Default)]
struct Ticker {
    tick_cb: Option<Closure<dyn FnMut()>>,
    interval: Option<i32>,
    visibility_cb: Option<Closure<dyn FnMut()>>,
    listening: bool,
    housekeeping_cb: Option<Closure<dyn FnMut()>>,
    housekeeping: Option<i32>,
}

thread_local! {
    static TICKER: RefCell<Ticker> = RefCell::new(Ticker::default());
}

/// Bring the interval and visibility listener in line with what the timer
/// currently needs.
pub fn sync(needs_tick: bool, listens_visibility: bool, tick_ms: u64) {
    TICKER.with(|t| {
        let mut t = t.borrow_mut();
        if needs_tick {
            t.start_interval(tick_ms);
        } else {
            t.clear_interval();
        }
        if listens_visibility {
            t.listen_visibility();
        } else {
            t.unlisten_visibility();
        }
    });
}

/// Drop every watch handle. Used on close and unmount.
pub fn teardown() {
    TICKER.with(|t| {
        let mut t = t.borrow_mut();
        t.clear_interval();
        t.unlisten_visibility();
    });
}

pub fn start_housekeeping(interval_ms: u64) {
    let Some(window) = web_sys::window() else {
        return;
    };
    TICKER.with(|t| {
        let mut t = t.borrow_mut();
        if let Some(handle) = t.housekeeping.take() {
            window.clear_interval_with_handle(handle);
        }
        let cb = t.housekeeping_cb.get_or_insert_with(|| {
            Closure::<dyn FnMut()>::new(move || {
                with_services(|svc| {
                    let removed = svc.cache.clear_expired();
                    if removed > 0 {
                        tracing::debug!("Housekeeping removed {} cache entries", removed);
                    }
                });
            })
        });
        match window.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            clamp_ms(interval_ms),
        ) {
            Ok(handle) => t.housekeeping = Some(handle),
            Err(e) => tracing::warn!("Could not start cache housekeeping: {:?}", e),
        }
    });
}

impl Ticker {
    fn start_interval(&mut self, tick_ms: u64) {
        if self.interval.is_some() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        let cb = self
            .tick_cb
            .get_or_insert_with(|| Closure::<dyn FnMut()>::new(super::on_tick));
        match window.set_interval_with_callback_and_timeout_and_arguments_0(
            cb.as_ref().unchecked_ref(),
            clamp_ms(tick_ms),
        ) {
            Ok(handle) => self.interval = Some(handle),
            Err(e) => tracing::warn!("Could not start watch ticker: {:?}", e),
        }
    }

    fn clear_interval(&mut self) {
        if let Some(handle) = self.interval.take() {
            if let Some(window) = web_sys::window() {
                window.clear_interval_with_handle(handle);
            }
        }
    }

    fn listen_visibility(&mut self) {
        if self.listening {
            return;
        }
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let cb = self.visibility_cb.get_or_insert_with(|| {
            Closure::<dyn FnMut()>::new(move || {
                super::on_visibility(page_visible());
            })
        });
        match document
            .add_event_listener_with_callback("visibilitychange", cb.as_ref().unchecked_ref())
        {
            Ok(()) => self.listening = true,
            Err(e) => tracing::warn!("Could not listen for visibility changes: {:?}", e),
        }
    }

    fn unlisten_visibility(&mut self) {
        if !self.listening {
            return;
        }
        self.listening = false;
        let (Some(document), Some(cb)) = (
            web_sys::window().and_then(|w| w.document()),
            self.visibility_cb.as_ref(),
        ) else {
            return;
        };
        if let Err(e) = document
            .remove_event_listener_with_callback("visibilitychange", cb.as_ref().unchecked_ref())
        {
            tracing::debug!("Removing visibility listener failed: {:?}", e);
        }
    }
}

fn page_visible() -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .map(|d| d.visibility_state() == VisibilityState::Visible)
        .unwrap_or(true)
}

fn clamp_ms(ms: u64) -> i32 {
    ms.clamp(1, i32::MAX as u64) as i32
}
