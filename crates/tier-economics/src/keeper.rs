// crates/tier-economics/src/keeper.rs
//
// The tier keeper: owner of the lockup store and entry point for every
// tier operation.
//
// Collaborators (staking, bank, epochs, distribution) are injected once at
// construction as trait objects. The keeper holds no global state; lifecycle,
// slashing, epoch and reward-processing operations are implemented on it in
// their own modules.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tier_core::{
    module_address, AccAddress, BankKeeper, DistributionKeeper, EpochsKeeper, StakingKeeper,
    TierError, CREDIT_DENOM, DEVELOPER_POOL_NAME, INSURANCE_POOL_NAME, MODULE_NAME,
};
use tier_store::{KvStore, LockupStore};

use crate::events::TierEvent;
use crate::metrics::TierMetrics;
use crate::params::Params;

/// Static module configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    /// Denomination of the credit token minted by the module.
    pub credit_denom: String,
    /// Epoch identifier whose boundaries drive the credit cycle.
    pub epoch_identifier: String,
    /// Account allowed to update params.
    pub authority: AccAddress,
}

impl TierConfig {
    /// Default credit denom and epoch identifier with the given authority.
    pub fn new(authority: AccAddress) -> Self {
        Self {
            credit_denom: CREDIT_DENOM.to_string(),
            epoch_identifier: MODULE_NAME.to_string(),
            authority,
        }
    }
}

/// Handles to every external service the keeper calls.
#[derive(Clone)]
pub struct Collaborators {
    pub staking: Arc<dyn StakingKeeper>,
    pub bank: Arc<dyn BankKeeper>,
    pub epochs: Arc<dyn EpochsKeeper>,
    pub distribution: Arc<dyn DistributionKeeper>,
}

/// The tier module keeper.
pub struct Keeper<S: KvStore> {
    pub(crate) store: LockupStore<S>,
    pub(crate) config: TierConfig,
    pub(crate) staking: Arc<dyn StakingKeeper>,
    pub(crate) bank: Arc<dyn BankKeeper>,
    pub(crate) epochs: Arc<dyn EpochsKeeper>,
    pub(crate) distribution: Arc<dyn DistributionKeeper>,
    pub(crate) metrics: Arc<TierMetrics>,
    events: Vec<TierEvent>,
}

impl<S: KvStore> Keeper<S> {
    pub fn new(kv: S, config: TierConfig, collaborators: Collaborators) -> Self {
        Self {
            store: LockupStore::new(kv),
            config,
            staking: collaborators.staking,
            bank: collaborators.bank,
            epochs: collaborators.epochs,
            distribution: collaborators.distribution,
            metrics: Arc::new(TierMetrics::new()),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Read-only view of the module store.
    pub fn store(&self) -> &LockupStore<S> {
        &self.store
    }

    pub fn metrics(&self) -> Arc<TierMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Account holding locked stake in custody and delegating it.
    pub fn module_address(&self) -> AccAddress {
        module_address(MODULE_NAME)
    }

    pub fn insurance_pool_address(&self) -> AccAddress {
        module_address(INSURANCE_POOL_NAME)
    }

    pub fn developer_pool_address(&self) -> AccAddress {
        module_address(DEVELOPER_POOL_NAME)
    }

    /// Current params; defaults when none have been stored yet.
    pub fn params(&self) -> Result<Params, TierError> {
        Ok(self.store.get_params()?.unwrap_or_default())
    }

    /// Validate and store a full params set. Nothing is written on failure.
    pub fn set_params(&mut self, params: &Params) -> Result<(), TierError> {
        params.validate()?;
        self.store.set_params(params)?;
        tracing::info!(
            "Tier params updated: epoch {:?}, {} unlocking epochs, {} reward tiers",
            params.epoch_duration,
            params.unlocking_epochs,
            params.reward_rates.len()
        );
        Ok(())
    }

    /// Governance-gated params update.
    pub fn update_params(&mut self, authority: &AccAddress, params: &Params) -> Result<(), TierError> {
        if authority != &self.config.authority {
            return Err(TierError::Unauthorized(format!(
                "expected authority {}, got {}",
                self.config.authority, authority
            )));
        }
        self.set_params(params)
    }

    pub(crate) fn emit(&mut self, event: TierEvent) {
        tracing::debug!("Tier event {}", event.name());
        self.events.push(event);
    }

    /// Take every event buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<TierEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn bond_denom(&self) -> String {
        self.staking.bond_denom()
    }
}

/// `time + duration`, failing on overflow.
pub(crate) fn add_duration(
    time: DateTime<Utc>,
    duration: std::time::Duration,
) -> Result<DateTime<Utc>, TierError> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| time.checked_add_signed(d))
        .ok_or_else(|| TierError::Overflow(format!("{} + {:?}", time, duration)))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::params::Rate;

    #[test]
    fn test_params_default_until_set() {
        let h = Harness::new();
        assert_eq!(h.keeper.params().unwrap(), Params::default());
    }

    #[test]
    fn test_update_params_requires_authority() {
        let mut h = Harness::new();
        let params = Params {
            unlocking_epochs: 5,
            ..Params::default()
        };
        let err = h.keeper.update_params(&del(9), &params).unwrap_err();
        assert_eq!(err.code(), "unauthorized");

        let authority = h.keeper.config().authority.clone();
        h.keeper.update_params(&authority, &params).unwrap();
        assert_eq!(h.keeper.params().unwrap().unlocking_epochs, 5);
    }

    #[test]
    fn test_invalid_params_are_not_stored() {
        let mut h = Harness::new();
        let bad = Params {
            reward_rates: vec![Rate::new(100, 110)],
            ..Params::default()
        };
        assert!(h.keeper.set_params(&bad).is_err());
        assert_eq!(h.keeper.params().unwrap(), Params::default());
    }

    #[test]
    fn test_module_addresses_are_distinct() {
        let h = Harness::new();
        assert_ne!(h.keeper.module_address(), h.keeper.insurance_pool_address());
        assert_ne!(h.keeper.module_address(), h.keeper.developer_pool_address());
    }

    #[test]
    fn test_add_duration() {
        let t = genesis_time();
        let later = add_duration(t, std::time::Duration::from_secs(60)).unwrap();
        assert_eq!((later - t).num_seconds(), 60);
    }
}
