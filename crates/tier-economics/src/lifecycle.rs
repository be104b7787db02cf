// crates/tier-economics/src/lifecycle.rs
//
// Lockup lifecycle: Lock, Unlock, Redelegate, CancelUnlocking and
// CompleteUnlocking.
//
// Every operation checks its preconditions and performs its collaborator
// calls before writing to the lockup store, so a failed operation leaves the
// store untouched.
//
//   Lock ──> Lockup ──Unlock──> UnlockingLockup ──CompleteUnlocking──> released
//              ^  └─Redelegate─> Lockup (other validator)   │
//              └──────────────CancelUnlocking───────────────┘

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tier_core::{
    checked_add, AccAddress, Amount, BlockContext, Coin, TierError, UnlockingLockup, ValAddress,
    MODULE_NAME,
};
use tier_store::KvStore;

use crate::events::TierEvent;
use crate::keeper::{add_duration, Keeper};
use crate::rewards::calculate_prorated_credit;

/// Result of a successful Lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReceipt {
    /// Lockup amount after the lock.
    pub locked: Amount,
    /// Credit minted to the delegator.
    pub credit_minted: Amount,
}

/// Result of a successful Unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockReceipt {
    pub creation_height: i64,
    /// Amount recorded in the unlocking lockup, as returned by staking.
    pub amount: Amount,
    pub completion_time: DateTime<Utc>,
    pub unlock_time: DateTime<Utc>,
}

fn require_positive(amount: Amount) -> Result<(), TierError> {
    if amount == 0 {
        return Err(TierError::InvalidAmount(
            "amount must be positive".to_string(),
        ));
    }
    Ok(())
}

impl<S: KvStore> Keeper<S> {
    /// Lock `amount` of the bond denom from `delegator` with `validator`.
    ///
    /// Moves the funds into module custody, delegates them on the module's
    /// behalf, grows the lockup, and mints credit prorated over the current
    /// epoch using the delegator's total before this lock as the base.
    pub fn lock(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<LockReceipt, TierError> {
        require_positive(amount)?;
        self.staking.get_validator(validator)?;

        let bond_denom = self.bond_denom();
        let spendable = self.bank.get_balance(delegator, &bond_denom).amount;
        if spendable < amount {
            return Err(TierError::InsufficientFunds(format!(
                "{} has {}{}, needs {}{}",
                delegator, spendable, bond_denom, amount, bond_denom
            )));
        }

        let params = self.params()?;
        let epoch = self.epochs.get_epoch_info(&self.config.epoch_identifier)?;
        let locked_before = self.store.total_amount_by_addr(delegator)?;
        let current = self.store.lockup_amount(delegator, validator)?;
        let locked = checked_add(current, amount)?;
        let credit = calculate_prorated_credit(
            &params.reward_rates,
            locked_before,
            amount,
            epoch.current_epoch_start_time,
            ctx.time,
            epoch.duration,
        )?;

        // Mint before moving stake; the lockup is written only after every
        // bank and staking call has succeeded.
        let credit_coin = Coin::new(self.config.credit_denom.clone(), credit);
        if credit > 0 {
            self.bank.mint_coins(MODULE_NAME, &credit_coin)?;
        }
        let stake = Coin::new(bond_denom, amount);
        if let Err(e) = self.delegate_into_custody(ctx, delegator, validator, &stake) {
            if credit > 0 {
                self.bank.burn_coins(MODULE_NAME, &credit_coin)?;
            }
            return Err(e);
        }
        if credit > 0 {
            self.bank
                .send_coins_from_module_to_account(MODULE_NAME, delegator, &credit_coin)?;
            self.metrics.record_credits_minted(credit);
        }

        self.store.add_lockup(delegator, validator, amount)?;

        self.metrics.record_lock();
        self.emit(TierEvent::Lock {
            delegator: delegator.clone(),
            validator: validator.clone(),
            amount,
            credit_minted: credit,
        });
        info!(
            "Locked {} from {} with {} (credit {})",
            amount, delegator, validator, credit
        );
        Ok(LockReceipt {
            locked,
            credit_minted: credit,
        })
    }

    /// Move `stake` from `delegator` into module custody and delegate it to
    /// `validator`. Custody is returned if staking rejects the delegation.
    fn delegate_into_custody(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        stake: &Coin,
    ) -> Result<(), TierError> {
        self.bank
            .delegate_coins_from_account_to_module(delegator, MODULE_NAME, stake)?;
        let module = self.module_address();
        if let Err(e) = self.staking.delegate(ctx, &module, stake.amount, validator) {
            self.bank
                .undelegate_coins_from_module_to_account(MODULE_NAME, delegator, stake)?;
            return Err(e);
        }
        Ok(())
    }

    /// Start unlocking `amount` of a lockup.
    ///
    /// The unlocking record is keyed by the current height; a second unlock
    /// of the same pair in the same block is merged into it.
    pub fn unlock(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<UnlockReceipt, TierError> {
        require_positive(amount)?;
        let lockup = self.store.get_lockup(delegator, validator)?.ok_or_else(|| {
            TierError::NotFound(format!(
                "lockup for delegator {} and validator {}",
                delegator, validator
            ))
        })?;
        if amount > lockup.amount {
            return Err(TierError::InvalidAmount(format!(
                "unlock of {} exceeds lockup of {} (delegator {}, validator {})",
                amount, lockup.amount, delegator, validator
            )));
        }

        let params = self.params()?;
        let unlock_time = add_duration(ctx.time, params.unlocking_period()?)?;
        let existing = self
            .store
            .get_unlocking_lockup(delegator, validator, ctx.height)?;

        let module = self.module_address();
        let shares = self
            .staking
            .validate_unbond_amount(&module, validator, amount)?;
        let (completion_time, unbonded) = self.staking.undelegate(ctx, &module, validator, shares)?;

        self.store.subtract_lockup(delegator, validator, amount)?;

        let record = match existing {
            Some(prev) => UnlockingLockup {
                amount: checked_add(prev.amount, unbonded)?,
                completion_time: prev.completion_time.max(completion_time),
                unlock_time: prev.unlock_time.max(unlock_time),
                ..prev
            },
            None => UnlockingLockup {
                delegator: delegator.clone(),
                validator: validator.clone(),
                creation_height: ctx.height,
                amount: unbonded,
                completion_time,
                unlock_time,
            },
        };
        if record.amount > 0 {
            self.store.set_unlocking_lockup(&record)?;
        }

        self.metrics.record_unlock();
        self.emit(TierEvent::Unlock {
            delegator: delegator.clone(),
            validator: validator.clone(),
            amount: unbonded,
            creation_height: ctx.height,
            completion_time,
            unlock_time,
        });
        info!(
            "Unlocking {} of {} from {} (unbonded {}, unlock at {})",
            amount, delegator, validator, unbonded, unlock_time
        );
        Ok(UnlockReceipt {
            creation_height: ctx.height,
            amount: unbonded,
            completion_time,
            unlock_time,
        })
    }

    /// Move `amount` of a lockup from `src` to `dst`. No credit is minted.
    pub fn redelegate(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        amount: Amount,
    ) -> Result<DateTime<Utc>, TierError> {
        require_positive(amount)?;
        if src == dst {
            return Err(TierError::InvalidRequest(format!(
                "cannot redelegate from {} to itself",
                src
            )));
        }
        let source = self.store.get_lockup(delegator, src)?.ok_or_else(|| {
            TierError::NotFound(format!(
                "lockup for delegator {} and validator {}",
                delegator, src
            ))
        })?;
        if amount > source.amount {
            return Err(TierError::InvalidAmount(format!(
                "redelegation of {} exceeds lockup of {} (delegator {}, validator {})",
                amount, source.amount, delegator, src
            )));
        }
        self.staking.get_validator(dst)?;
        checked_add(self.store.lockup_amount(delegator, dst)?, amount)?;

        let module = self.module_address();
        let shares = self.staking.validate_unbond_amount(&module, src, amount)?;
        let completion_time = self
            .staking
            .begin_redelegation(ctx, &module, src, dst, shares)?;

        self.store.subtract_lockup(delegator, src, amount)?;
        self.store.add_lockup(delegator, dst, amount)?;

        self.metrics.record_redelegation();
        self.emit(TierEvent::Redelegate {
            delegator: delegator.clone(),
            src_validator: src.clone(),
            dst_validator: dst.clone(),
            amount,
            completion_time,
        });
        info!(
            "Redelegated {} of {} from {} to {}",
            amount, delegator, src, dst
        );
        Ok(completion_time)
    }

    /// Return `amount` of a pending unlock to the active lockup.
    pub fn cancel_unlocking(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
        amount: Amount,
    ) -> Result<(), TierError> {
        require_positive(amount)?;
        let record = self
            .store
            .get_unlocking_lockup(delegator, validator, creation_height)?
            .ok_or_else(|| {
                TierError::NotFound(format!(
                    "unlocking lockup for delegator {}, validator {}, height {}",
                    delegator, validator, creation_height
                ))
            })?;
        if amount > record.amount {
            return Err(TierError::InvalidAmount(format!(
                "cancel of {} exceeds unlocking amount {} (delegator {}, validator {}, height {})",
                amount, record.amount, delegator, validator, creation_height
            )));
        }
        checked_add(self.store.lockup_amount(delegator, validator)?, amount)?;

        let module = self.module_address();
        self.staking
            .cancel_unbonding_delegation(ctx, &module, validator, creation_height, amount)?;

        self.store
            .subtract_unlocking_lockup(delegator, validator, creation_height, amount)?;
        self.store.add_lockup(delegator, validator, amount)?;

        self.metrics.record_cancellation();
        self.emit(TierEvent::CancelUnlocking {
            delegator: delegator.clone(),
            validator: validator.clone(),
            creation_height,
            amount,
        });
        info!(
            "Cancelled unlocking {} of {} with {} (height {})",
            amount, delegator, validator, creation_height
        );
        Ok(())
    }

    /// Release every unlocking lockup whose unlock time and unbonding
    /// completion have both passed.
    ///
    /// Returns the number of records released. A record whose unbonding is
    /// still running stays in the store for a later epoch end, so calling
    /// this repeatedly is harmless.
    pub fn complete_unlocking(&mut self, ctx: &BlockContext) -> Result<u64, TierError> {
        let matured: Vec<UnlockingLockup> = self
            .store
            .iter_unlocking_lockups()
            .filter(|entry| match entry {
                Ok(record) => record.is_releasable(ctx.time),
                Err(_) => true,
            })
            .collect::<Result<_, _>>()?;

        let bond_denom = self.bond_denom();
        let mut released = 0u64;
        for record in matured {
            debug!(
                "Releasing {} to {} (validator {}, height {})",
                record.amount, record.delegator, record.validator, record.creation_height
            );
            let coin = Coin::new(bond_denom.clone(), record.amount);
            self.bank
                .undelegate_coins_from_module_to_account(MODULE_NAME, &record.delegator, &coin)?;
            self.store.remove_unlocking_lockup(
                &record.delegator,
                &record.validator,
                record.creation_height,
            )?;
            self.emit(TierEvent::CompleteUnlocking {
                delegator: record.delegator,
                validator: record.validator,
                creation_height: record.creation_height,
                amount: record.amount,
            });
            released += 1;
        }

        if released > 0 {
            self.metrics.record_unlockings_completed(released);
            info!("Completed {} unlocking lockups", released);
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::keeper::test_support::*;
    use crate::keeper::{Collaborators, TierConfig};
    use crate::params::Params;
    use tier_core::{BalanceIter, BankKeeper, StakingKeeper, CREDIT_DENOM, DEFAULT_BOND_DENOM};
    use tier_sim::{SimChain, SimEpochs};
    use tier_store::MemStore;

    /// Bank that refuses to mint and forwards everything else to the chain.
    struct MintRejectingBank(Arc<SimChain>);

    impl BankKeeper for MintRejectingBank {
        fn get_balance(&self, address: &AccAddress, denom: &str) -> Coin {
            self.0.get_balance(address, denom)
        }

        fn iterate_all_balances(&self) -> BalanceIter<'_> {
            self.0.iterate_all_balances()
        }

        fn mint_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError> {
            Err(TierError::Bank(format!("minting {} to {} is disabled", coin, module)))
        }

        fn burn_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError> {
            self.0.burn_coins(module, coin)
        }

        fn send_coins_from_account_to_module(
            &self,
            from: &AccAddress,
            module: &str,
            coin: &Coin,
        ) -> Result<(), TierError> {
            self.0.send_coins_from_account_to_module(from, module, coin)
        }

        fn send_coins_from_module_to_account(
            &self,
            module: &str,
            to: &AccAddress,
            coin: &Coin,
        ) -> Result<(), TierError> {
            self.0.send_coins_from_module_to_account(module, to, coin)
        }

        fn send_coins_from_module_to_module(
            &self,
            from_module: &str,
            to_module: &str,
            coin: &Coin,
        ) -> Result<(), TierError> {
            self.0.send_coins_from_module_to_module(from_module, to_module, coin)
        }

        fn delegate_coins_from_account_to_module(
            &self,
            from: &AccAddress,
            module: &str,
            coin: &Coin,
        ) -> Result<(), TierError> {
            self.0.delegate_coins_from_account_to_module(from, module, coin)
        }

        fn undelegate_coins_from_module_to_account(
            &self,
            module: &str,
            to: &AccAddress,
            coin: &Coin,
        ) -> Result<(), TierError> {
            self.0.undelegate_coins_from_module_to_account(module, to, coin)
        }
    }

    fn bond_balance(h: &Harness, addr: &AccAddress) -> Amount {
        h.chain.get_balance(addr, DEFAULT_BOND_DENOM).amount
    }

    fn credit_balance(h: &Harness, addr: &AccAddress) -> Amount {
        h.chain.get_balance(addr, CREDIT_DENOM).amount
    }

    #[test]
    fn test_lock_rejects_zero() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        let err = h.keeper.lock(&ctx, &del(1), &val(1), 0).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
    }

    #[test]
    fn test_lock_unknown_validator() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        let err = h.keeper.lock(&ctx, &del(1), &val(9), 10).unwrap_err();
        assert_eq!(err.code(), "validator_not_found");
        assert_eq!(h.keeper.store().total_lockups_amount().unwrap(), 0);
    }

    #[test]
    fn test_lock_insufficient_funds_leaves_no_state() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        let err = h
            .keeper
            .lock(&ctx, &del(1), &val(1), 2_000_000_000)
            .unwrap_err();
        assert_eq!(err.code(), "insufficient_funds");
        assert!(h.keeper.store().get_lockup(&del(1), &val(1)).unwrap().is_none());
        assert_eq!(bond_balance(&h, &del(1)), 1_000_000_000);
    }

    #[test]
    fn test_lock_moves_funds_delegates_and_mints_full_credit_at_epoch_end() {
        let mut h = Harness::new();
        // Full epoch elapsed: proration is 100%.
        let ctx = h.ctx(1, EPOCH_SECS);
        let receipt = h.keeper.lock(&ctx, &del(1), &val(1), 250_000_000).unwrap();

        assert_eq!(receipt.locked, 250_000_000);
        assert_eq!(receipt.credit_minted, 270_000_000);
        assert_eq!(credit_balance(&h, &del(1)), 270_000_000);
        assert_eq!(bond_balance(&h, &del(1)), 750_000_000);

        let module = h.keeper.module_address();
        let delegation = h.chain.get_delegation(&module, &val(1)).unwrap().unwrap();
        assert!(!delegation.shares.is_zero());
        assert_eq!(h.keeper.metrics().snapshot().locks, 1);

        let events = h.keeper.drain_events();
        assert_eq!(events.len(), 1);
        assert!(h.keeper.drain_events().is_empty());
    }

    #[test]
    fn test_lock_prorates_and_uses_prior_total() {
        let mut h = Harness::new();
        // Half the epoch elapsed.
        let ctx = h.ctx(1, EPOCH_SECS / 2);
        let first = h.keeper.lock(&ctx, &del(1), &val(1), 100_000_000).unwrap();
        assert_eq!(first.credit_minted, 50_000_000);

        // Second lock on another validator starts from the 100M already locked:
        // 100M in the 1.10 band, prorated by half.
        let second = h.keeper.lock(&ctx, &del(1), &val(2), 100_000_000).unwrap();
        assert_eq!(second.credit_minted, 55_000_000);
        assert_eq!(h.keeper.store().total_amount_by_addr(&del(1)).unwrap(), 200_000_000);
    }

    #[test]
    fn test_lock_then_unlock_round_trip() {
        let mut h = Harness::new();
        let ctx = h.ctx(5, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 1_000).unwrap();
        let receipt = h.keeper.unlock(&ctx, &del(1), &val(1), 1_000).unwrap();

        assert!(h.keeper.store().get_lockup(&del(1), &val(1)).unwrap().is_none());
        let records: Vec<UnlockingLockup> = h
            .keeper
            .store()
            .iter_unlocking_lockups()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 1_000);
        assert_eq!(records[0].creation_height, 5);
        assert_eq!(receipt.creation_height, 5);
        // Two epochs of 300s against 120s of unbonding.
        assert_eq!((receipt.unlock_time - ctx.time).num_seconds(), 2 * EPOCH_SECS);
        assert!(receipt.unlock_time > receipt.completion_time);
    }

    #[test]
    fn test_unlock_errors() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 10);
        let err = h.keeper.unlock(&ctx, &del(1), &val(1), 5).unwrap_err();
        assert_eq!(err.code(), "not_found");

        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        let err = h.keeper.unlock(&ctx, &del(1), &val(1), 101).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
        let err = h.keeper.unlock(&ctx, &del(1), &val(1), 0).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 100);
    }

    #[test]
    fn test_two_unlocks_in_one_block_merge() {
        let mut h = Harness::new();
        let ctx = h.ctx(3, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 30).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 20).unwrap();
        let record = h
            .keeper
            .store()
            .get_unlocking_lockup(&del(1), &val(1), 3)
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, 50);
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 50);
    }

    #[test]
    fn test_redelegate_moves_lockup_without_credit() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 500).unwrap();
        let credit_before = credit_balance(&h, &del(1));

        h.keeper
            .redelegate(&ctx, &del(1), &val(1), &val(2), 200)
            .unwrap();

        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 300);
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(2)).unwrap(), 200);
        assert_eq!(h.keeper.store().total_amount_by_addr(&del(1)).unwrap(), 500);
        assert_eq!(credit_balance(&h, &del(1)), credit_before);

        let module = h.keeper.module_address();
        assert!(h.chain.get_delegation(&module, &val(2)).unwrap().is_some());
    }

    #[test]
    fn test_redelegate_rejections() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();

        let same = h.keeper.redelegate(&ctx, &del(1), &val(1), &val(1), 10);
        assert_eq!(same.unwrap_err().code(), "invalid_request");
        let zero = h.keeper.redelegate(&ctx, &del(1), &val(1), &val(2), 0);
        assert_eq!(zero.unwrap_err().code(), "invalid_amount");
        let over = h.keeper.redelegate(&ctx, &del(1), &val(1), &val(2), 101);
        assert_eq!(over.unwrap_err().code(), "invalid_amount");
        let missing = h.keeper.redelegate(&ctx, &del(2), &val(1), &val(2), 1);
        assert_eq!(missing.unwrap_err().code(), "not_found");
        let unknown = h.keeper.redelegate(&ctx, &del(1), &val(1), &val(9), 1);
        assert_eq!(unknown.unwrap_err().code(), "validator_not_found");

        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 100);
    }

    #[test]
    fn test_cancel_partial_and_full() {
        let mut h = Harness::new();
        let ctx = h.ctx(7, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 60).unwrap();

        let later = h.ctx(8, 20);
        h.keeper
            .cancel_unlocking(&later, &del(1), &val(1), 7, 20)
            .unwrap();
        let record = h
            .keeper
            .store()
            .get_unlocking_lockup(&del(1), &val(1), 7)
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, 40);
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 60);

        h.keeper
            .cancel_unlocking(&later, &del(1), &val(1), 7, 40)
            .unwrap();
        assert!(h
            .keeper
            .store()
            .get_unlocking_lockup(&del(1), &val(1), 7)
            .unwrap()
            .is_none());
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 100);
        assert_eq!(h.keeper.metrics().snapshot().cancellations, 2);
    }

    #[test]
    fn test_cancel_errors() {
        let mut h = Harness::new();
        let ctx = h.ctx(7, 10);
        let err = h
            .keeper
            .cancel_unlocking(&ctx, &del(1), &val(1), 7, 1)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");

        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 60).unwrap();
        let err = h
            .keeper
            .cancel_unlocking(&ctx, &del(1), &val(1), 7, 61)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
        let err = h
            .keeper
            .cancel_unlocking(&ctx, &del(1), &val(1), 7, 0)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
    }

    #[test]
    fn test_complete_unlocking_is_idempotent() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        h.keeper.lock(&ctx, &del(1), &val(1), 1_000).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 1_000).unwrap();

        // Staking releases custody after its own unbonding period.
        h.chain.end_block(&h.ctx(2, UNBONDING_SECS));
        let before_deadline = h.ctx(3, 2 * EPOCH_SECS - 1);
        assert_eq!(h.keeper.complete_unlocking(&before_deadline).unwrap(), 0);

        let balance_before = bond_balance(&h, &del(1));
        let after = h.ctx(4, 2 * EPOCH_SECS);
        assert_eq!(h.keeper.complete_unlocking(&after).unwrap(), 1);
        assert_eq!(bond_balance(&h, &del(1)), balance_before + 1_000);

        assert_eq!(h.keeper.complete_unlocking(&after).unwrap(), 0);
        assert_eq!(bond_balance(&h, &del(1)), balance_before + 1_000);
        assert_eq!(h.keeper.store().iter_unlocking_lockups().count(), 0);
    }

    #[test]
    fn test_failed_credit_mint_leaves_no_lockup() {
        let h = Harness::new();
        let collaborators = Collaborators {
            staking: h.chain.clone(),
            bank: Arc::new(MintRejectingBank(h.chain.clone())),
            epochs: Arc::new(SimEpochs::new(
                "tier",
                Duration::from_secs(EPOCH_SECS as u64),
                genesis_time(),
            )),
            distribution: h.chain.clone(),
        };
        let mut keeper = Keeper::new(
            MemStore::new(),
            TierConfig::new(AccAddress::from_bytes([0xAA; 20])),
            collaborators,
        );

        let ctx = h.ctx(1, EPOCH_SECS);
        let err = keeper.lock(&ctx, &del(1), &val(1), 1_000).unwrap_err();
        assert_eq!(err.code(), "bank");

        assert!(keeper.store().get_lockup(&del(1), &val(1)).unwrap().is_none());
        assert_eq!(keeper.store().total_lockups_amount().unwrap(), 0);
        assert_eq!(bond_balance(&h, &del(1)), 1_000_000_000);
        let module = keeper.module_address();
        assert!(h.chain.get_delegation(&module, &val(1)).unwrap().is_none());
        assert!(keeper.drain_events().is_empty());
    }

    #[test]
    fn test_complete_unlocking_waits_for_staking_unbonding() {
        let mut h = Harness::new();
        // One 30s unlocking epoch is shorter than the 120s staking unbonding.
        let params = Params {
            epoch_duration: Duration::from_secs(30),
            unlocking_epochs: 1,
            ..Params::default()
        };
        h.keeper.set_params(&params).unwrap();
        let module = h.keeper.module_address();

        let first = h.ctx(1, 0);
        h.keeper.lock(&first, &del(2), &val(1), 1_000).unwrap();
        h.keeper.unlock(&first, &del(2), &val(1), 1_000).unwrap();
        h.chain.end_block(&h.ctx(2, UNBONDING_SECS));
        assert_eq!(bond_balance(&h, &module), 1_000);

        // Unlock deadline at 160s, unbonding completes at 250s.
        let second = h.ctx(3, 130);
        h.keeper.lock(&second, &del(1), &val(1), 500).unwrap();
        let receipt = h.keeper.unlock(&second, &del(1), &val(1), 500).unwrap();
        assert!(receipt.unlock_time < receipt.completion_time);

        let del1_before = bond_balance(&h, &del(1));
        let del2_before = bond_balance(&h, &del(2));
        let epoch_end = h.ctx(4, 200);
        assert_eq!(h.keeper.complete_unlocking(&epoch_end).unwrap(), 1);
        assert_eq!(bond_balance(&h, &del(2)), del2_before + 1_000);
        assert_eq!(bond_balance(&h, &del(1)), del1_before);
        assert_eq!(bond_balance(&h, &module), 0);
        assert!(h
            .keeper
            .store()
            .get_unlocking_lockup(&del(1), &val(1), 3)
            .unwrap()
            .is_some());

        h.chain.end_block(&h.ctx(5, 250));
        let next_epoch_end = h.ctx(6, 260);
        assert_eq!(h.keeper.complete_unlocking(&next_epoch_end).unwrap(), 1);
        assert_eq!(bond_balance(&h, &del(1)), del1_before + 500);
        assert_eq!(bond_balance(&h, &module), 0);
        assert_eq!(h.keeper.store().iter_unlocking_lockups().count(), 0);
    }
}
