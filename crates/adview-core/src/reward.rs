use std::rc::Rc;

use serde_json::{json, Value};

use crate::api::{ApiAction, ApiTransport, CallOptions};
use crate::cache::CachedApi;
use crate::error::ClaimError;
use crate::ledger::BalanceLedger;
use crate::profile::ProfileStore;
use crate::types::Ad;

/// Result of a successful claim. The host shows a toast from it and advances
/// to the next ad after `advance_after_ms`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimOutcome {
    pub ad_id: String,
    pub reward: f64,
    pub balance: f64,
    /// Whether the server confirmed the new balance.
    pub synced: bool,
    /// View count to mirror locally.
    pub view_count: u64,
    pub advance_after_ms: u64,
}

impl ClaimOutcome {
    pub fn message(&self) -> String {
        format!("+{} tokens earned! Balance: {}", self.reward, self.balance)
    }
}

/// Credits a completed watch.
///
/// The local credit and watched-set write always happen first; the remote
/// balance sync and view counter are best-effort and never roll them back.
pub struct RewardService<T> {
    profiles: ProfileStore,
    ledger: BalanceLedger,
    api: Rc<CachedApi<T>>,
    advance_after_ms: u64,
}

impl<T: ApiTransport> RewardService<T> {
    pub fn new(
        profiles: ProfileStore,
        ledger: BalanceLedger,
        api: Rc<CachedApi<T>>,
        advance_after_ms: u64,
    ) -> Self {
        Self {
            profiles,
            ledger,
            api,
            advance_after_ms,
        }
    }

    pub async fn claim(&self, ad: &Ad) -> Result<ClaimOutcome, ClaimError> {
        if self.profiles.is_watched(&ad.id) {
            return Err(ClaimError::AlreadyEarned(ad.id.clone()));
        }

        let reward = ad.reward_per_view.abs();
        let local_balance = self
            .ledger
            .try_apply_balance_change(reward, &format!("reward for ad {}", ad.id))?;
        if !self.profiles.mark_watched(&ad.id) {
            tracing::warn!("Could not persist watched flag for ad {}", ad.id);
        }

        let synced = self.sync_balance(ad, reward, local_balance).await;
        let view_count = self.increment_views(ad).await;

        tracing::info!("Claimed {} for ad {} (synced: {})", reward, ad.id, synced);
        Ok(ClaimOutcome {
            ad_id: ad.id.clone(),
            reward,
            balance: self.ledger.get_current_balance(),
            synced,
            view_count,
            advance_after_ms: self.advance_after_ms,
        })
    }

    async fn sync_balance(&self, ad: &Ad, reward: f64, local_balance: f64) -> bool {
        let email = self.profiles.load().map(|p| p.email).unwrap_or_default();
        let options = CallOptions::new().body(json!({
            "email": email,
            "adId": ad.id,
            "amount": reward,
            "balance": local_balance,
        }));
        match self.api.call(ApiAction::UpdateBalance, options, false).await {
            Ok(response) => match server_balance(&response) {
                Some(balance) => match self.ledger.set_authoritative_balance(balance) {
                    Ok(_) => {
                        self.api.cache().invalidate_action(ApiAction::GetProfile);
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Server balance {} rejected: {}", balance, e);
                        false
                    }
                },
                None => {
                    tracing::debug!("Balance sync response carried no balance");
                    false
                }
            },
            Err(e) => {
                tracing::warn!("Balance sync failed, keeping local value: {}", e);
                false
            }
        }
    }

    async fn increment_views(&self, ad: &Ad) -> u64 {
        let local = ad.view_count.saturating_add(1);
        let options = CallOptions::new().param("id", ad.id.clone());
        match self
            .api
            .call(ApiAction::IncrementViewCount, options, false)
            .await
        {
            Ok(response) => read_u64(&response, &["viewCount", "view_count"]).unwrap_or(local),
            Err(e) => {
                tracing::warn!("View count update for {} failed: {}", ad.id, e);
                local
            }
        }
    }
}

fn server_balance(response: &Value) -> Option<f64> {
    ["balance", "newBalance"]
        .iter()
        .find_map(|k| response.get(k).and_then(Value::as_f64))
        .or_else(|| response.pointer("/user/balance").and_then(Value::as_f64))
}

fn read_u64(response: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|k| response.get(k).and_then(Value::as_u64))
        .or_else(|| response.pointer("/ad/viewCount").and_then(Value::as_u64))
}
