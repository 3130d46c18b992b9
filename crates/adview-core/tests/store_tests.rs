mod fixtures;

use std::rc::Rc;

use adview_core::store::{keys, FailureMode, LocalStore, MemoryBackend};
use adview_core::types::UserProfile;
use fixtures::Harness;

#[test]
fn get_returns_default_for_missing_key() {
    let store = LocalStore::new(MemoryBackend::new());
    assert_eq!(store.get("nope", "fallback"), "fallback");
    assert_eq!(store.get_opt("nope"), None);
}

#[test]
fn set_then_get_round_trips() {
    let store = LocalStore::new(MemoryBackend::new());
    assert!(store.set(keys::DARK_MODE, "true"));
    assert_eq!(store.get(keys::DARK_MODE, "false"), "true");
    assert!(store.remove(keys::DARK_MODE));
    assert_eq!(store.get(keys::DARK_MODE, "false"), "false");
}

#[test]
fn get_json_falls_back_on_malformed_value() {
    let store = LocalStore::new(MemoryBackend::new());
    store.set(keys::USER_PROFILE, "{not json");
    let profile: Option<UserProfile> = store.get_json(keys::USER_PROFILE, None);
    assert!(profile.is_none());
    let list: Vec<String> = store.get_json(keys::LEGACY_WATCHED_ADS, vec!["x".into()]);
    assert_eq!(list, vec!["x".to_string()]);
}

#[test]
fn quota_exceeded_writes_return_false() {
    let backend = Rc::new(MemoryBackend::new());
    let store = LocalStore::new(backend.clone());
    assert!(store.set("a", "1"));

    backend.fail_with(Some(FailureMode::QuotaExceeded));
    assert!(!store.set("b", "2"));
    assert!(!store.set_json("c", &vec![1, 2, 3]));
    assert!(!store.remove("a"));
    // Reads still work under quota pressure
    assert_eq!(store.get("a", ""), "1");
    assert!(!store.is_available());
}

#[test]
fn unavailable_storage_degrades_to_defaults() {
    let backend = Rc::new(MemoryBackend::new());
    let store = LocalStore::new(backend.clone());
    backend.fail_with(Some(FailureMode::Unavailable));

    assert_eq!(store.get("k", "d"), "d");
    assert_eq!(store.get_json("k", 7u32), 7);
    assert!(store.keys_with_prefix("").is_empty());
    assert!(!store.is_available());

    backend.fail_with(None);
    assert!(store.is_available());
    assert!(backend.is_empty(), "probe key must not be left behind");
}

#[test]
fn keys_with_prefix_filters() {
    let store = LocalStore::new(MemoryBackend::new());
    store.set("cache_a_x", "1");
    store.set("cache_b_x", "1");
    store.set("authToken", "t");
    let mut keys = store.keys_with_prefix("cache_");
    keys.sort();
    assert_eq!(keys, vec!["cache_a_x", "cache_b_x"]);
}

#[test]
fn profile_unknown_fields_survive_overwrite() {
    let h = Harness::new();
    h.store.set(
        keys::USER_PROFILE,
        r#"{"email":"a@x.io","balance":3,"watched_ads":[],"verified":true,"region":"EU"}"#,
    );
    let mut profile = h.profiles.load().unwrap();
    profile.balance = Some(4.0);
    assert!(h.profiles.save(&profile));

    let raw = h.store.get(keys::USER_PROFILE, "");
    assert!(raw.contains("\"region\":\"EU\""), "extra field lost: {raw}");
}

#[test]
fn legacy_watched_ads_are_folded_into_profile() {
    let h = Harness::with_user("a@x.io", 0.0);
    h.profiles.mark_watched("ad-1");
    h.store
        .set_json(keys::LEGACY_WATCHED_ADS, &vec!["ad-1", "ad-2", "ad-3"]);

    assert_eq!(h.profiles.migrate_legacy_watched(), 2);
    assert_eq!(h.profiles.watched_ads(), vec!["ad-1", "ad-2", "ad-3"]);
    assert_eq!(h.store.get_opt(keys::LEGACY_WATCHED_ADS), None);
    assert_eq!(h.profiles.migrate_legacy_watched(), 0);
}

#[test]
fn mark_watched_is_idempotent() {
    let h = Harness::with_user("a@x.io", 0.0);
    assert!(h.profiles.mark_watched("ad-1"));
    assert!(!h.profiles.mark_watched("ad-1"));
    assert_eq!(h.profiles.watched_ads(), vec!["ad-1"]);
}

#[test]
fn logout_clears_session_keys() {
    let h = Harness::new();
    assert!(h.profiles.login(UserProfile::new("a@x.io"), "tok"));
    h.store.set(keys::REFRESH_TOKEN, "r");
    assert_eq!(h.profiles.auth_token().as_deref(), Some("tok"));

    assert_eq!(h.profiles.logout(), "a@x.io");
    assert_eq!(h.profiles.auth_token(), None);
    assert!(h.profiles.load().is_none());
    assert_eq!(h.store.get_opt(keys::REFRESH_TOKEN), None);
    assert_eq!(h.profiles.current_user_id(), "anonymous");
}

#[test]
fn dark_mode_flag_persists() {
    let h = Harness::new();
    assert!(!h.profiles.dark_mode());
    h.profiles.set_dark_mode(true);
    assert!(h.profiles.dark_mode());
}

#[test]
fn remote_profile_merge_keeps_local_watched() {
    let h = Harness::with_user("a@x.io", 2.0);
    h.profiles.mark_watched("offline-ad");
    let mut remote = UserProfile::new("a@x.io");
    remote.balance = Some(9.0);
    remote.watched_ads = vec!["server-ad".into()];
    remote.verified = true;

    let merged = h.profiles.merge_remote(remote);
    assert_eq!(merged.balance(), 9.0);
    assert!(merged.verified);
    assert_eq!(merged.watched_ads, vec!["server-ad", "offline-ad"]);
    assert_eq!(h.profiles.load().unwrap(), merged);
}
