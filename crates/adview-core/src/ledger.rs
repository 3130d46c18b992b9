use std::future::Future;

use crate::error::{ApiError, LedgerError};
use crate::events::AppEvent;
use crate::profile::ProfileStore;
use crate::types::UserProfile;

/// Spendable balance, stored only as `userProfile.balance`.
///
/// The balance never goes negative: a change that would make it negative is
/// rejected before anything is written.
#[derive(Clone)]
pub struct BalanceLedger {
    profiles: ProfileStore,
}

impl BalanceLedger {
    pub fn new(profiles: ProfileStore) -> Self {
        Self { profiles }
    }

    pub fn get_current_balance(&self) -> f64 {
        self.profiles.load().map(|p| p.balance()).unwrap_or(0.0)
    }

    pub fn has_sufficient_balance(&self, amount: f64) -> bool {
        self.get_current_balance() >= amount
    }

    /// `false` means the balance is unchanged and the caller must abort.
    pub fn apply_balance_change(&self, delta: f64, reason: &str) -> bool {
        match self.try_apply_balance_change(delta, reason) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Balance change {:+} ({}) rejected: {}", delta, reason, e);
                false
            }
        }
    }

    /// Returns the new balance.
    pub fn try_apply_balance_change(&self, delta: f64, reason: &str) -> Result<f64, LedgerError> {
        if !delta.is_finite() {
            return Err(LedgerError::InvalidAmount);
        }
        let mut profile = self.profiles.load().unwrap_or_default();
        let previous = profile.balance();
        let next = previous + delta;
        if next < 0.0 {
            return Err(LedgerError::InsufficientFunds {
                balance: previous,
                delta,
            });
        }
        profile.balance = Some(next);
        self.commit(profile, previous)?;
        tracing::debug!(
            "Balance {} -> {} ({:+}, {})",
            previous,
            next,
            delta,
            reason
        );
        Ok(next)
    }

    pub fn add_to_balance(&self, amount: f64) -> bool {
        self.apply_balance_change(amount.abs(), "credit")
    }

    pub fn subtract_from_balance(&self, amount: f64) -> bool {
        self.apply_balance_change(-amount.abs(), "debit")
    }

    /// Overwrite with a server-confirmed balance.
    pub fn set_authoritative_balance(&self, balance: f64) -> Result<f64, LedgerError> {
        if !balance.is_finite() {
            return Err(LedgerError::InvalidAmount);
        }
        if balance < 0.0 {
            return Err(LedgerError::InsufficientFunds {
                balance: self.get_current_balance(),
                delta: balance,
            });
        }
        let mut profile = self.profiles.load().unwrap_or_default();
        let previous = profile.balance();
        profile.balance = Some(balance);
        self.commit(profile, previous)?;
        Ok(balance)
    }

    /// Schema migration: copy legacy `localBalance` into `balance` when the
    /// latter is missing, then drop the legacy field. Safe to call on every
    /// load.
    pub fn cleanup(&self) -> bool {
        let Some(mut profile) = self.profiles.load() else {
            return false;
        };
        let Some(legacy) = profile.local_balance.take() else {
            return false;
        };
        if profile.balance.is_none() {
            profile.balance = Some(legacy.max(0.0));
        }
        let migrated = self.profiles.save(&profile);
        if migrated {
            tracing::info!("Migrated legacy localBalance for {}", profile.email);
        }
        migrated
    }

    /// Deduct `amount` only after `remote` succeeds, so nothing is charged for a
    /// resource that was never created. Funds are checked up front so the
    /// remote call is not made when the deduction would be rejected.
    pub async fn charge_after_remote<R, F, Fut>(
        &self,
        amount: f64,
        reason: &str,
        remote: F,
    ) -> Result<R, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, ApiError>>,
    {
        let amount = amount.abs();
        if !amount.is_finite() {
            return Err(LedgerError::InvalidAmount);
        }
        let balance = self.get_current_balance();
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                delta: -amount,
            });
        }
        let created = remote().await?;
        self.try_apply_balance_change(-amount, reason)?;
        Ok(created)
    }

    fn commit(&self, profile: UserProfile, previous_balance: f64) -> Result<(), LedgerError> {
        if !self.profiles.save(&profile) {
            return Err(LedgerError::Storage);
        }
        self.profiles.events().emit(&AppEvent::ProfileUpdated {
            profile,
            previous_balance,
        });
        Ok(())
    }
}
