mod fixtures;

use adview_core::controller::{Key, KeyAction, WatchController};
use adview_core::queue::{AdQueue, SortOrder};
use adview_core::timer::{WatchState, WatchTimer};
use adview_core::types::AdType;
use fixtures::{ad, redirect_ad, Harness};

fn ids(queue: &AdQueue) -> Vec<&str> {
    queue.ads().iter().map(|a| a.id.as_str()).collect()
}

#[test]
fn new_queue_sorts_by_reward_descending() {
    let queue = AdQueue::new(vec![ad("low", 1.0), ad("high", 9.0), ad("mid", 5.0)]);
    assert_eq!(ids(&queue), vec!["high", "mid", "low"]);
    assert_eq!(queue.order(), SortOrder::Reward);
    assert_eq!(queue.index(), None);
}

#[test]
fn unwatched_first_groups_then_sorts() {
    let mut queue = AdQueue::new(vec![
        ad("w-high", 10.0),
        ad("u-low", 1.0),
        ad("w-low", 2.0),
        ad("u-high", 8.0),
    ]);
    queue.sort_unwatched_first(&["w-high".to_string(), "w-low".to_string()]);
    assert_eq!(ids(&queue), vec!["u-high", "u-low", "w-high", "w-low"]);
}

#[test]
fn resort_keeps_selected_ad() {
    let mut queue = AdQueue::new(vec![ad("a", 3.0), ad("b", 2.0), ad("c", 1.0)]);
    queue.select("a");
    queue.sort_unwatched_first(&["a".to_string()]);
    assert_eq!(queue.current().map(|a| a.id.as_str()), Some("a"));
    assert_eq!(queue.index(), Some(2));
}

#[test]
fn navigation_wraps_both_ways() {
    let mut queue = AdQueue::new(vec![ad("a", 3.0), ad("b", 2.0), ad("c", 1.0)]);
    assert!(queue.next().is_none(), "no selection, nothing to advance");
    queue.select("c");
    assert_eq!(queue.next().map(|a| a.id.clone()), Some("a".into()));
    assert_eq!(queue.previous().map(|a| a.id.clone()), Some("c".into()));
    assert_eq!(queue.previous().map(|a| a.id.clone()), Some("b".into()));
}

#[test]
fn replace_ads_keeps_selection_by_id() {
    let mut queue = AdQueue::new(vec![ad("a", 3.0), ad("b", 2.0)]);
    queue.select("b");
    queue.replace_ads(vec![ad("z", 9.0), ad("b", 2.0)], &[]);
    assert_eq!(queue.current().map(|a| a.id.as_str()), Some("b"));
    queue.replace_ads(vec![ad("z", 9.0)], &[]);
    assert!(queue.current().is_none());
}

#[test]
fn view_count_mirror_updates() {
    let mut queue = AdQueue::new(vec![ad("a", 1.0)]);
    assert!(queue.set_view_count("a", 12));
    assert_eq!(queue.ads()[0].view_count, 12);
    assert!(!queue.set_view_count("missing", 1));
}

fn controller(h: &Harness) -> WatchController {
    WatchController::new(
        AdQueue::new(vec![
            ad("n1", 5.0),
            redirect_ad("r1", 4.0),
            ad("n2", 3.0),
        ]),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    )
}

#[test]
fn switching_ads_tears_down_running_timer() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    c.open("n1", 0);
    c.tick(6_000);
    assert_eq!(c.snapshot().remaining_secs, 4);

    // n1 -> r1: redirect ads wait for a click
    let next = c.next(6_000).map(|a| a.id.clone());
    assert_eq!(next.as_deref(), Some("r1"));
    assert_eq!(c.timer().state(), WatchState::Idle);
    assert_eq!(c.snapshot().remaining_secs, 10);

    // r1 -> n2: fresh full countdown
    c.next(7_000);
    assert_eq!(c.timer().state(), WatchState::Running);
    c.tick(8_000);
    assert_eq!(c.snapshot().remaining_secs, 9);
}

#[test]
fn leaving_redirect_pending_cancels_it() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    c.open("r1", 0);
    c.visit_site(0).unwrap();
    assert!(c.snapshot().is_redirect_pending);
    c.previous(500);
    assert_eq!(c.current_ad().map(|a| a.id.as_str()), Some("n1"));
    assert_eq!(c.timer().state(), WatchState::Running);
    assert_eq!(c.timer().redirect_clicked_ms(), None);
    // Returning from the site no longer completes anything
    assert_eq!(c.on_visibility(true, 20_000), None);
}

#[test]
fn watched_ads_open_as_claimed() {
    let h = Harness::with_user("u@x.io", 0.0);
    h.profiles.mark_watched("n2");
    let mut c = controller(&h);
    c.open("n2", 0);
    assert_eq!(c.timer().state(), WatchState::Claimed);
    assert!(!c.timer().needs_tick());
    assert!(c.claimable().is_none());
}

#[test]
fn watched_redirect_cannot_be_visited_again() {
    let h = Harness::with_user("u@x.io", 0.0);
    h.profiles.mark_watched("r1");
    let mut c = controller(&h);
    c.open("r1", 0);
    assert!(c.visit_site(0).is_none());
}

#[test]
fn script_ads_stay_idle() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut script = ad("s1", 2.0);
    script.ad_type = AdType::Script;
    let mut c = WatchController::new(
        AdQueue::new(vec![script]),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    );
    c.open("s1", 0);
    assert_eq!(c.timer().state(), WatchState::Idle);
    assert!(c.visit_site(0).is_none());
}

#[test]
fn keyboard_maps_to_navigation() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    assert_eq!(c.handle_key(Key::ArrowDown, 0), None, "ignored without selection");

    c.open("n1", 0);
    assert_eq!(c.handle_key(Key::ArrowDown, 0), Some(KeyAction::Next));
    assert_eq!(c.current_ad().map(|a| a.id.as_str()), Some("r1"));
    assert_eq!(c.handle_key(Key::ArrowUp, 0), Some(KeyAction::Previous));
    assert_eq!(c.current_ad().map(|a| a.id.as_str()), Some("n1"));
    assert_eq!(c.handle_key(Key::Other, 0), None);
    assert_eq!(c.handle_key(Key::Escape, 0), Some(KeyAction::Close));
    assert!(c.current_ad().is_none());
    assert_eq!(c.timer().state(), WatchState::Idle);
}

#[test]
fn key_codes_parse() {
    assert_eq!(Key::from_code("ArrowUp"), Key::ArrowUp);
    assert_eq!(Key::from_code("ArrowDown"), Key::ArrowDown);
    assert_eq!(Key::from_code("Escape"), Key::Escape);
    assert_eq!(Key::from_code("Enter"), Key::Other);
}

#[test]
fn open_unknown_ad_is_refused() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    assert!(!c.open("nope", 0));
    assert!(c.current_ad().is_none());
}

#[test]
fn refresh_dropping_open_ad_stops_its_timer() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    c.open("n1", 0);
    assert_eq!(c.timer().state(), WatchState::Running);

    c.replace_ads(vec![ad("n2", 3.0)], &[]);
    assert!(c.current_ad().is_none());
    assert_eq!(c.timer().state(), WatchState::Idle);
    assert!(!c.timer().needs_tick());
    assert!(!c.timer().listens_visibility());
    assert_eq!(c.tick(10_000), None);
}

#[test]
fn refresh_keeping_open_ad_keeps_counting() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    c.open("n2", 0);
    c.tick(4_000);

    c.replace_ads(vec![ad("n9", 9.0), ad("n2", 3.0)], &[]);
    assert_eq!(c.current_ad().map(|a| a.id.as_str()), Some("n2"));
    assert_eq!(c.timer().state(), WatchState::Running);
    assert_eq!(c.snapshot().remaining_secs, 6);
}

#[test]
fn blocked_popup_rearms_visit() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = controller(&h);
    c.open("r1", 0);
    assert!(c.visit_site(0).is_some());

    assert!(c.cancel_redirect());
    assert_eq!(c.timer().state(), WatchState::Idle);
    assert_eq!(c.timer().redirect_clicked_ms(), None);
    assert_eq!(c.on_visibility(true, 20_000), None);
    assert!(!c.cancel_redirect());

    assert!(c.visit_site(1_000).is_some());
    assert!(c.snapshot().is_redirect_pending);
}

#[test]
fn first_load_ranks_by_reward_even_with_watched_ads() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut c = WatchController::new(
        AdQueue::new(Vec::new()),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    );
    assert_eq!(SortOrder::default(), SortOrder::Reward);

    let watched = vec!["high".to_string()];
    c.replace_ads(vec![ad("low", 1.0), ad("high", 9.0)], &watched);
    assert_eq!(c.queue().order(), SortOrder::Reward);
    assert_eq!(ids(c.queue()), vec!["high", "low"]);
}
