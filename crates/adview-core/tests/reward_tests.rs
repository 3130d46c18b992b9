mod fixtures;

use adview_core::api::ApiAction;
use adview_core::controller::WatchController;
use adview_core::error::ClaimError;
use adview_core::queue::AdQueue;
use adview_core::reward::RewardService;
use adview_core::timer::{TimerEvent, WatchState, WatchTimer};
use embassy_futures::block_on;
use fixtures::{ad, redirect_ad, Harness, ScriptedTransport};
use serde_json::json;

fn service(h: &Harness, transport: &std::rc::Rc<ScriptedTransport>) -> RewardService<std::rc::Rc<ScriptedTransport>> {
    RewardService::new(
        h.profiles.clone(),
        h.ledger.clone(),
        h.api(transport.clone()),
        h.config.auto_advance_delay_ms,
    )
}

#[test]
fn end_to_end_watch_and_claim() {
    let h = Harness::with_user("u@x.io", 0.0);
    let transport = ScriptedTransport::new();
    let rewards = service(&h, &transport);
    let mut controller = WatchController::new(
        AdQueue::new(vec![ad("a1", 5.0), ad("a2", 1.0)]),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    );

    assert!(controller.open("a1", 0));
    assert_eq!(controller.timer().state(), WatchState::Running);
    assert!(controller.claimable().is_none());

    let mut now = 0;
    let mut event = None;
    while event.is_none() {
        now += 100;
        event = controller.tick(now);
    }
    assert_eq!(event, Some(TimerEvent::Completed));
    assert_eq!(now, 10_000);

    let target = controller.claimable().cloned().unwrap();
    let outcome = block_on(rewards.claim(&target)).unwrap();
    controller.finish_claim(&outcome);

    assert_eq!(outcome.reward, 5.0);
    assert_eq!(h.ledger.get_current_balance(), 5.0);
    assert_eq!(h.profiles.watched_ads(), vec!["a1"]);
    assert_eq!(controller.timer().state(), WatchState::Claimed);
    assert_eq!(outcome.advance_after_ms, 1_500);

    let again = block_on(rewards.claim(&target));
    assert_eq!(again, Err(ClaimError::AlreadyEarned("a1".into())));
    assert_eq!(h.ledger.get_current_balance(), 5.0);
    assert_eq!(h.profiles.watched_ads(), vec!["a1"]);
}

#[test]
fn offline_claim_keeps_local_credit_and_bumps_views() {
    let h = Harness::with_user("u@x.io", 1.0);
    let transport = ScriptedTransport::new();
    let rewards = service(&h, &transport);
    let mut target = ad("a1", 2.0);
    target.view_count = 41;

    let outcome = block_on(rewards.claim(&target)).unwrap();
    assert!(!outcome.synced);
    assert_eq!(outcome.balance, 3.0);
    assert_eq!(outcome.view_count, 42);
    assert_eq!(
        transport.calls(),
        vec![ApiAction::UpdateBalance, ApiAction::IncrementViewCount]
    );
}

#[test]
fn server_balance_overrides_local_and_drops_profile_cache() {
    let h = Harness::with_user("u@x.io", 1.0);
    h.cache.set("getProfile", &json!({"balance": 1}), None);
    let transport = ScriptedTransport::new();
    transport.respond(ApiAction::UpdateBalance, Ok(json!({"newBalance": 50.0})));
    transport.respond(ApiAction::IncrementViewCount, Ok(json!({"viewCount": 7})));
    let rewards = service(&h, &transport);

    let outcome = block_on(rewards.claim(&ad("a1", 2.0))).unwrap();
    assert!(outcome.synced);
    assert_eq!(outcome.balance, 50.0);
    assert_eq!(outcome.view_count, 7);
    assert_eq!(h.ledger.get_current_balance(), 50.0);
    assert!(h.cache.get("getProfile", None).is_none());
}

#[test]
fn balance_sync_sends_id_and_amount() {
    let h = Harness::with_user("u@x.io", 0.0);
    let transport = ScriptedTransport::new();
    let rewards = service(&h, &transport);
    block_on(rewards.claim(&ad("a7", 3.0))).unwrap();

    let options = transport.last_options(ApiAction::UpdateBalance).unwrap();
    let body = options.body.unwrap();
    assert_eq!(body["adId"], "a7");
    assert_eq!(body["amount"], 3.0);
    assert_eq!(body["email"], "u@x.io");
    let views = transport.last_options(ApiAction::IncrementViewCount).unwrap();
    assert_eq!(views.params.get("id").map(String::as_str), Some("a7"));
}

#[test]
fn redirect_flow_credits_once() {
    let h = Harness::with_user("u@x.io", 0.0);
    let transport = ScriptedTransport::new();
    let rewards = service(&h, &transport);
    let mut controller = WatchController::new(
        AdQueue::new(vec![redirect_ad("r1", 4.0)]),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    );

    controller.open("r1", 0);
    assert_eq!(controller.timer().state(), WatchState::Idle);
    assert_eq!(controller.tick(5_000), None);

    let link = controller.visit_site(1_000).unwrap();
    assert_eq!(link, "https://example.com/r1");
    assert!(controller.visit_site(1_100).is_none(), "already pending");
    controller.on_visibility(false, 1_050);
    controller.tick(6_000);

    assert_eq!(
        controller.on_visibility(true, 11_500),
        Some(TimerEvent::RedirectCompleted)
    );
    let target = controller.claimable().cloned().unwrap();
    let outcome = block_on(rewards.claim(&target)).unwrap();
    controller.finish_claim(&outcome);
    assert_eq!(h.ledger.get_current_balance(), 4.0);
    assert!(block_on(rewards.claim(&target)).is_err());
    assert_eq!(h.ledger.get_current_balance(), 4.0);
}

#[test]
fn redirect_early_return_credits_nothing() {
    let h = Harness::with_user("u@x.io", 0.0);
    let mut controller = WatchController::new(
        AdQueue::new(vec![redirect_ad("r1", 4.0)]),
        WatchTimer::from_config(&h.config),
        h.profiles.clone(),
    );
    controller.open("r1", 0);
    controller.visit_site(0);
    controller.on_visibility(false, 10);
    let event = controller.on_visibility(true, 9_999);
    assert!(matches!(event, Some(TimerEvent::RedirectShortfall { .. })));
    assert_eq!(controller.timer().state(), WatchState::Idle);
    assert!(controller.claimable().is_none());
    assert_eq!(h.ledger.get_current_balance(), 0.0);
}

#[test]
fn failed_ledger_write_aborts_claim() {
    let h = Harness::with_user("u@x.io", 0.0);
    let transport = ScriptedTransport::new();
    let rewards = service(&h, &transport);
    h.backend
        .fail_with(Some(adview_core::store::FailureMode::QuotaExceeded));

    let result = block_on(rewards.claim(&ad("a1", 1.0)));
    assert!(matches!(result, Err(ClaimError::Ledger(_))));
    assert!(transport.calls().is_empty());
}
