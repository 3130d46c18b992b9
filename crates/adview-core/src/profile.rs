use crate::events::{AppEvent, EventBus};
use crate::store::{keys, LocalStore};
use crate::types::UserProfile;

pub const ANONYMOUS_USER: &str = "anonymous";

/// Session-owned user profile, persisted wholesale under `userProfile`.
///
/// Callers merge before writing: `save` replaces the stored object.
#[derive(Clone)]
pub struct ProfileStore {
    store: LocalStore,
    events: EventBus,
}

impl ProfileStore {
    pub fn new(store: LocalStore, events: EventBus) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn load(&self) -> Option<UserProfile> {
        self.store.get_json_opt(keys::USER_PROFILE)
    }

    pub fn save(&self, profile: &UserProfile) -> bool {
        self.store.set_json(keys::USER_PROFILE, profile)
    }

    /// Identity used to scope cache entries.
    pub fn current_user_id(&self) -> String {
        self.load()
            .map(|p| p.email)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string())
    }

    pub fn auth_token(&self) -> Option<String> {
        self.store
            .get_opt(keys::AUTH_TOKEN)
            .or_else(|| self.store.get_opt(keys::ACCESS_TOKEN))
            .filter(|t| !t.is_empty())
    }

    pub fn watched_ads(&self) -> Vec<String> {
        self.load().map(|p| p.watched_ads).unwrap_or_default()
    }

    pub fn is_watched(&self, ad_id: &str) -> bool {
        self.load().is_some_and(|p| p.has_watched(ad_id))
    }

    /// Add `ad_id` to the watched set. Returns false when already present or
    /// when there is no profile to write to.
    pub fn mark_watched(&self, ad_id: &str) -> bool {
        let Some(mut profile) = self.load() else {
            tracing::warn!("No profile loaded, cannot record watched ad {}", ad_id);
            return false;
        };
        if profile.has_watched(ad_id) {
            return false;
        }
        profile.watched_ads.push(ad_id.to_string());
        self.save(&profile)
    }

    /// Merge a server copy into the stored profile and write the result.
    /// Server fields win, except that the watched set is the union of both so a
    /// reward claimed offline is never forgotten.
    pub fn merge_remote(&self, remote: UserProfile) -> UserProfile {
        let merged = match self.load() {
            Some(local) => {
                let mut merged = remote;
                if merged.email.is_empty() {
                    merged.email = local.email;
                }
                if merged.balance.is_none() {
                    merged.balance = local.balance;
                }
                for id in local.watched_ads {
                    if !merged.has_watched(&id) {
                        merged.watched_ads.push(id);
                    }
                }
                for (k, v) in local.extra {
                    merged.extra.entry(k).or_insert(v);
                }
                merged
            }
            None => remote,
        };
        if !self.save(&merged) {
            tracing::warn!("Merged profile for {} not persisted", merged.email);
        }
        merged
    }

    pub fn login(&self, profile: UserProfile, token: &str) -> bool {
        let saved = self.store.set(keys::AUTH_TOKEN, token) && self.save(&profile);
        if saved {
            tracing::info!("User {} logged in", profile.email);
            self.events.emit(&AppEvent::UserLoggedIn {
                profile,
                token: token.to_string(),
            });
        }
        saved
    }

    /// Drop tokens and profile. Returns the user id that was active so the
    /// caller can clear that user's cache.
    pub fn logout(&self) -> String {
        let user = self.current_user_id();
        for key in [
            keys::AUTH_TOKEN,
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::USER_PROFILE,
        ] {
            self.store.remove(key);
        }
        tracing::info!("User {} logged out", user);
        user
    }

    /// Fold the legacy top-level `watchedAds` array into the profile.
    pub fn migrate_legacy_watched(&self) -> usize {
        let Some(legacy) = self
            .store
            .get_json_opt::<Vec<String>>(keys::LEGACY_WATCHED_ADS)
        else {
            return 0;
        };
        let Some(mut profile) = self.load() else {
            return 0;
        };
        let mut added = 0;
        for id in legacy {
            if !profile.has_watched(&id) {
                profile.watched_ads.push(id);
                added += 1;
            }
        }
        if self.save(&profile) {
            self.store.remove(keys::LEGACY_WATCHED_ADS);
            if added > 0 {
                tracing::info!("Migrated {} legacy watched ads into profile", added);
            }
        }
        added
    }

    pub fn dark_mode(&self) -> bool {
        self.store.get(keys::DARK_MODE, "false") == "true"
    }

    pub fn set_dark_mode(&self, enabled: bool) -> bool {
        self.store
            .set(keys::DARK_MODE, if enabled { "true" } else { "false" })
    }
}
