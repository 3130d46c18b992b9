mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use adview_core::error::{ApiError, LedgerError};
use adview_core::events::AppEvent;
use adview_core::store::{keys, FailureMode};
use embassy_futures::block_on;
use fixtures::Harness;
use proptest::prelude::*;

#[test]
fn balance_defaults_to_zero_without_profile() {
    let h = Harness::new();
    assert_eq!(h.ledger.get_current_balance(), 0.0);
    assert!(h.ledger.has_sufficient_balance(0.0));
    assert!(!h.ledger.has_sufficient_balance(0.01));
}

#[test]
fn add_and_subtract_use_absolute_amounts() {
    let h = Harness::with_user("a@x.io", 10.0);
    assert!(h.ledger.add_to_balance(-5.0));
    assert_eq!(h.ledger.get_current_balance(), 15.0);
    assert!(h.ledger.subtract_from_balance(-3.0));
    assert_eq!(h.ledger.get_current_balance(), 12.0);
}

#[test]
fn overdraft_is_rejected_without_write() {
    let h = Harness::with_user("a@x.io", 4.0);
    let before = h.store.get(keys::USER_PROFILE, "");
    assert!(!h.ledger.subtract_from_balance(5.0));
    assert_eq!(h.ledger.get_current_balance(), 4.0);
    assert_eq!(h.store.get(keys::USER_PROFILE, ""), before);

    assert!(matches!(
        h.ledger.try_apply_balance_change(-5.0, "test"),
        Err(LedgerError::InsufficientFunds { .. })
    ));
}

#[test]
fn exact_spend_reaches_zero() {
    let h = Harness::with_user("a@x.io", 2.5);
    assert!(h.ledger.subtract_from_balance(2.5));
    assert_eq!(h.ledger.get_current_balance(), 0.0);
}

#[test]
fn non_finite_delta_is_rejected() {
    let h = Harness::with_user("a@x.io", 1.0);
    assert!(!h.ledger.apply_balance_change(f64::NAN, "bad"));
    assert!(!h.ledger.apply_balance_change(f64::INFINITY, "bad"));
    assert_eq!(h.ledger.get_current_balance(), 1.0);
}

#[test]
fn storage_failure_reports_false() {
    let h = Harness::with_user("a@x.io", 1.0);
    h.backend.fail_with(Some(FailureMode::QuotaExceeded));
    assert!(!h.ledger.add_to_balance(1.0));
    h.backend.fail_with(None);
    assert_eq!(h.ledger.get_current_balance(), 1.0);
}

#[test]
fn change_broadcasts_previous_balance() {
    let h = Harness::with_user("a@x.io", 3.0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _sub = h.events.subscribe(move |e| {
        if let AppEvent::ProfileUpdated {
            profile,
            previous_balance,
        } = e
        {
            sink.borrow_mut().push((*previous_balance, profile.balance()));
        }
    });

    h.ledger.add_to_balance(2.0);
    h.ledger.subtract_from_balance(100.0);
    assert_eq!(*seen.borrow(), vec![(3.0, 5.0)]);
}

#[test]
fn cleanup_migrates_legacy_field() {
    let h = Harness::new();
    h.store.set(
        keys::USER_PROFILE,
        r#"{"email":"a@x.io","localBalance":7.5,"watched_ads":[]}"#,
    );
    assert!(h.ledger.cleanup());
    assert_eq!(h.ledger.get_current_balance(), 7.5);
    let raw = h.store.get(keys::USER_PROFILE, "");
    assert!(!raw.contains("localBalance"));
    assert!(!h.ledger.cleanup(), "second run has nothing to do");
}

#[test]
fn cleanup_keeps_existing_balance_over_legacy() {
    let h = Harness::new();
    h.store.set(
        keys::USER_PROFILE,
        r#"{"email":"a@x.io","balance":1,"localBalance":9}"#,
    );
    assert!(h.ledger.cleanup());
    assert_eq!(h.ledger.get_current_balance(), 1.0);
    assert!(!h.store.get(keys::USER_PROFILE, "").contains("localBalance"));
}

#[test]
fn authoritative_balance_overwrites_local() {
    let h = Harness::with_user("a@x.io", 3.0);
    assert_eq!(h.ledger.set_authoritative_balance(42.0), Ok(42.0));
    assert_eq!(h.ledger.get_current_balance(), 42.0);
    assert!(h.ledger.set_authoritative_balance(-1.0).is_err());
    assert_eq!(h.ledger.get_current_balance(), 42.0);
}

#[test]
fn charge_happens_only_after_remote_success() {
    let h = Harness::with_user("a@x.io", 10.0);

    let failed: Result<(), _> = block_on(h.ledger.charge_after_remote(4.0, "create ad", || async {
        Err(ApiError::Network("down".into()))
    }));
    assert!(matches!(failed, Err(LedgerError::Remote(_))));
    assert_eq!(h.ledger.get_current_balance(), 10.0);

    let created = block_on(
        h.ledger
            .charge_after_remote(4.0, "create ad", || async { Ok("ad-9") }),
    );
    assert_eq!(created, Ok("ad-9"));
    assert_eq!(h.ledger.get_current_balance(), 6.0);
}

#[test]
fn charge_skips_remote_when_funds_are_short() {
    let h = Harness::with_user("a@x.io", 1.0);
    let called = Rc::new(RefCell::new(false));
    let flag = called.clone();
    let result = block_on(h.ledger.charge_after_remote(5.0, "create ad", move || {
        *flag.borrow_mut() = true;
        async { Ok(()) }
    }));
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    assert!(!*called.borrow());
}

#[derive(Debug, Clone)]
enum Op {
    Add(f64),
    Subtract(f64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0.0f64..1000.0).prop_map(Op::Add),
        (0.0f64..1000.0).prop_map(Op::Subtract),
    ]
}

proptest! {
    #[test]
    fn balance_never_negative(start in 0.0f64..500.0, ops in prop::collection::vec(op_strategy(), 0..40)) {
        let h = Harness::with_user("p@x.io", start);
        for op in ops {
            let before = h.ledger.get_current_balance();
            let (ok, delta) = match op {
                Op::Add(a) => (h.ledger.add_to_balance(a), a),
                Op::Subtract(a) => (h.ledger.subtract_from_balance(a), -a),
            };
            let after = h.ledger.get_current_balance();
            prop_assert!(after >= 0.0);
            if ok {
                prop_assert_eq!(after, before + delta);
            } else {
                prop_assert!(before + delta < 0.0);
                prop_assert_eq!(after, before);
            }
        }
    }
}
