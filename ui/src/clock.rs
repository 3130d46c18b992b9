use adview_core::clock::Clock;

/// Wall-clock milliseconds, used for cache expiry.
#[derive(Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// `performance.now()` in milliseconds, used to drive the watch timer.
/// Falls back to the wall clock when the Performance API is missing.
#[derive(Clone, Copy, Default)]
pub struct PerfClock;

impl Clock for PerfClock {
    fn now_ms(&self) -> u64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now() as u64)
            .unwrap_or_else(|| js_sys::Date::now() as u64)
    }
}
