pub mod ticker;

use std::cell::Cell;

use adview_core::controller::{Key, KeyAction};
use adview_core::error::ClaimError;
use adview_core::timer::TimerEvent;
use dioxus::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::services::{services, with_services, Services};
use crate::state::{Toast, ToastKind, ADS, CLAIMING, TOAST, WATCH};

const TOAST_MS: i32 = 3_000;

thread_local! {
    static NEXT_TOAST_ID: Cell<u64> = const { Cell::new(0) };
}

/// Push the controller's render state into `WATCH` and re-sync browser
/// handles with what the timer needs now.
pub fn publish(svc: &Services) {
    let (snapshot, needs_tick, listens) = {
        let watch = svc.watch.borrow();
        let open = watch.current_ad().is_some();
        (
            open.then(|| watch.snapshot()),
            watch.timer().needs_tick(),
            watch.timer().listens_visibility(),
        )
    };
    if *WATCH.peek() != snapshot {
        *WATCH.write() = snapshot;
    }
    ticker::sync(needs_tick, listens, svc.config.tick_interval_ms);
}

/// Publish the ad order and view counts as well.
pub fn publish_queue(svc: &Services) {
    let ads = svc.watch.borrow().queue().ads().to_vec();
    *ADS.write() = ads;
    publish(svc);
}

pub fn open(ad_id: &str) {
    with_services(|svc| {
        let now = svc.now_ms();
        if !svc.watch.borrow_mut().open(ad_id, now) {
            tracing::warn!("Ad {} is not in the queue", ad_id);
        }
        publish(svc);
    });
}

pub fn close() {
    with_services(|svc| {
        svc.watch.borrow_mut().close();
        publish(svc);
    });
    ticker::teardown();
}

pub fn next() {
    with_services(|svc| {
        let now = svc.now_ms();
        svc.watch.borrow_mut().next(now);
        publish(svc);
    });
}

pub fn previous() {
    with_services(|svc| {
        let now = svc.now_ms();
        svc.watch.borrow_mut().previous(now);
        publish(svc);
    });
}

/// Pass on a completed ad without claiming it.
pub fn skip() {
    with_services(|svc| {
        if !svc.watch.borrow_mut().skip() {
            return;
        }
        let now = svc.now_ms();
        svc.watch.borrow_mut().next(now);
        publish(svc);
    });
}

/// Open the advertiser's site in a new tab and start the away-time check.
pub fn visit_site() {
    with_services(|svc| {
        let now = svc.now_ms();
        let url = svc.watch.borrow_mut().visit_site(now);
        publish(svc);
        let Some(url) = url else { return };
        let opened = web_sys::window().map(|w| w.open_with_url_and_target(&url, "_blank"));
        match opened {
            Some(Ok(Some(_))) => {
                tracing::info!("Opened {}", url);
                return;
            }
            Some(Ok(None)) => tracing::warn!("Popup blocked for {}", url),
            Some(Err(e)) => tracing::warn!("window.open failed for {}: {:?}", url, e),
            None => tracing::warn!("No window to open {}", url),
        }
        if svc.watch.borrow_mut().cancel_redirect() {
            publish(svc);
        }
        show_toast(
            "Popup blocked. Allow popups to visit the site.".to_string(),
            ToastKind::Error,
        );
    });
}

pub fn handle_key(code: &str) {
    let key = Key::from_code(code);
    if key == Key::Other {
        return;
    }
    with_services(|svc| {
        let now = svc.now_ms();
        let action = svc.watch.borrow_mut().handle_key(key, now);
        publish(svc);
        if action == Some(KeyAction::Close) {
            ticker::teardown();
        }
    });
}

/// Interval callback.
pub(crate) fn on_tick() {
    with_services(|svc| {
        let now = svc.now_ms();
        let event = svc.watch.borrow_mut().tick(now);
        publish(svc);
        if let Some(event) = event {
            on_timer_event(event);
        }
    });
}

/// `visibilitychange` callback.
pub(crate) fn on_visibility(visible: bool) {
    with_services(|svc| {
        let now = svc.now_ms();
        let event = svc.watch.borrow_mut().on_visibility(visible, now);
        publish(svc);
        if let Some(event) = event {
            on_timer_event(event);
        }
    });
}

fn on_timer_event(event: TimerEvent) {
    match event {
        TimerEvent::Completed => {}
        TimerEvent::RedirectCompleted => claim(),
        TimerEvent::RedirectShortfall {
            elapsed_ms,
            required_ms,
        } => show_toast(
            format!(
                "You came back after {}s. Stay on the site for {}s to earn the reward.",
                elapsed_ms / 1000,
                required_ms / 1000
            ),
            ToastKind::Info,
        ),
        TimerEvent::RedirectAbandoned => show_toast(
            "Visit timed out. You can still claim your reward.".to_string(),
            ToastKind::Info,
        ),
    }
}

/// Credit the open ad if its watch has completed.
pub fn claim() {
    let Some(svc) = services() else { return };
    if *CLAIMING.peek() {
        return;
    }
    let Some(ad) = svc.watch.borrow().claimable().cloned() else {
        tracing::debug!("Nothing claimable");
        return;
    };
    *CLAIMING.write() = true;

    wasm_bindgen_futures::spawn_local(async move {
        let result = svc.rewards.claim(&ad).await;
        *CLAIMING.write() = false;
        match result {
            Ok(outcome) => {
                svc.watch.borrow_mut().finish_claim(&outcome);
                publish_queue(&svc);
                show_toast(outcome.message(), ToastKind::Success);
                schedule_advance(outcome.ad_id.clone(), outcome.advance_after_ms);
            }
            Err(e @ ClaimError::AlreadyEarned(_)) => show_toast(e.to_string(), ToastKind::Info),
            Err(e) => {
                tracing::warn!("Claim for {} failed: {}", ad.id, e);
                show_toast(e.to_string(), ToastKind::Error);
            }
        }
    });
}

/// Move on from `ad_id` after `delay_ms`, unless the user already has.
fn schedule_advance(ad_id: String, delay_ms: u64) {
    let callback = Closure::once_into_js(move || {
        with_services(|svc| {
            let still_open = svc
                .watch
                .borrow()
                .current_ad()
                .is_some_and(|a| a.id == ad_id);
            if still_open {
                let now = svc.now_ms();
                svc.watch.borrow_mut().next(now);
                publish(svc);
            }
        });
    });
    set_timeout(callback.unchecked_ref(), delay_ms.min(i32::MAX as u64) as i32);
}

pub fn show_toast(message: String, kind: ToastKind) {
    let id = NEXT_TOAST_ID.with(|n| {
        let id = n.get() + 1;
        n.set(id);
        id
    });
    *TOAST.write() = Some(Toast { id, message, kind });

    let callback = Closure::once_into_js(move || {
        let current = TOAST.peek().as_ref().map(|t| t.id);
        if current == Some(id) {
            *TOAST.write() = None;
        }
    });
    set_timeout(callback.unchecked_ref(), TOAST_MS);
}

fn set_timeout(callback: &js_sys::Function, delay_ms: i32) {
    let Some(window) = web_sys::window() else {
        tracing::debug!("No window for timeout");
        return;
    };
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay_ms)
    {
        tracing::debug!("setTimeout failed: {:?}", e);
    }
}
