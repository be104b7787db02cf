// crates/tier-economics/src/epoch.rs
//
// Epoch cycle handler.
//
// At the start of every tier epoch all outstanding credit is burned and
// re-minted from current lockup totals at the full, unprorated rate. At the
// end of every tier epoch matured unlocking lockups are released. Errors from
// either hook are returned to the host, which treats them as fatal: a
// half-applied credit reset would leave the ledger inconsistent.

use tracing::{debug, info};

use tier_core::{checked_add, Amount, Balance, BlockContext, Coin, EpochHooks, TierError, MODULE_NAME};
use tier_store::KvStore;

use crate::keeper::Keeper;
use crate::rewards::calculate_credit;

impl<S: KvStore> Keeper<S> {
    /// Burn every credit balance in existence. Returns the amount burned.
    ///
    /// Credit is freely transferable, so every account balance is scanned,
    /// not just delegators with lockups.
    pub fn burn_all_credits(&mut self) -> Result<Amount, TierError> {
        let denom = self.config.credit_denom.clone();
        let holders: Vec<Balance> = self
            .bank
            .iterate_all_balances()
            .filter(|b| b.coin.denom == denom && !b.coin.is_zero())
            .collect();

        let module = self.module_address();
        let mut total: Amount = 0;
        for holder in holders {
            if holder.address != module {
                self.bank
                    .send_coins_from_account_to_module(&holder.address, MODULE_NAME, &holder.coin)?;
            }
            total = checked_add(total, holder.coin.amount)?;
        }

        if total > 0 {
            self.bank.burn_coins(MODULE_NAME, &Coin::new(denom, total))?;
            self.metrics.record_credits_burned(total);
        }
        debug!("Burned {} credit", total);
        Ok(total)
    }

    /// Mint full-rate credit to every delegator from their total lockup.
    /// Returns the amount minted.
    pub fn reset_all_credits(&mut self) -> Result<Amount, TierError> {
        let params = self.params()?;
        let totals = self.store.totals_by_delegator()?;

        let mut minted: Amount = 0;
        for (delegator, locked) in totals {
            if locked == 0 {
                continue;
            }
            let credit = calculate_credit(&params.reward_rates, 0, locked)?;
            if credit == 0 {
                continue;
            }
            let coin = Coin::new(self.config.credit_denom.clone(), credit);
            self.bank.mint_coins(MODULE_NAME, &coin)?;
            self.bank
                .send_coins_from_module_to_account(MODULE_NAME, &delegator, &coin)?;
            minted = checked_add(minted, credit)?;
        }

        self.metrics.record_credits_minted(minted);
        debug!("Minted {} credit", minted);
        Ok(minted)
    }
}

impl<S: KvStore> EpochHooks for Keeper<S> {
    fn before_epoch_start(
        &mut self,
        _ctx: &BlockContext,
        identifier: &str,
        epoch_number: i64,
    ) -> Result<(), TierError> {
        if identifier != self.config.epoch_identifier {
            return Ok(());
        }
        let burned = self.burn_all_credits()?;
        let minted = self.reset_all_credits()?;
        info!(
            "Tier epoch {} started: burned {} credit, minted {}",
            epoch_number, burned, minted
        );
        Ok(())
    }

    fn after_epoch_end(
        &mut self,
        ctx: &BlockContext,
        identifier: &str,
        epoch_number: i64,
    ) -> Result<(), TierError> {
        if identifier != self.config.epoch_identifier {
            return Ok(());
        }
        let released = self.complete_unlocking(ctx)?;
        info!(
            "Tier epoch {} ended: released {} unlocking lockups",
            epoch_number, released
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::test_support::*;
    use tier_core::{BankKeeper, CREDIT_DENOM};

    fn credit(h: &Harness, d: u8) -> Amount {
        h.chain.get_balance(&del(d), CREDIT_DENOM).amount
    }

    #[test]
    fn test_epoch_start_resets_credit_to_full_rate() {
        let mut h = Harness::new();
        // Locked right at epoch start: no prorated credit.
        let ctx = h.ctx(1, 0);
        h.keeper.lock(&ctx, &del(1), &val(1), 150_000_000).unwrap();
        h.keeper.lock(&ctx, &del(1), &val(2), 100_000_000).unwrap();
        h.keeper.lock(&ctx, &del(2), &val(1), 50_000_000).unwrap();
        assert_eq!(credit(&h, 1), 0);

        let next = h.ctx(2, EPOCH_SECS);
        h.keeper.before_epoch_start(&next, "tier", 2).unwrap();

        // 250M across two validators is rewarded as one total.
        assert_eq!(credit(&h, 1), 270_000_000);
        assert_eq!(credit(&h, 2), 50_000_000);
    }

    #[test]
    fn test_credit_held_by_anyone_is_burned() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, EPOCH_SECS);
        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        assert_eq!(credit(&h, 1), 100);

        // Credit given away to an account with no lockup.
        let stranger = del(0x55);
        h.chain
            .transfer(&del(1), &stranger, &Coin::new(CREDIT_DENOM, 40))
            .unwrap();

        h.keeper.before_epoch_start(&ctx, "tier", 2).unwrap();
        assert_eq!(h.chain.get_balance(&stranger, CREDIT_DENOM).amount, 0);
        assert_eq!(credit(&h, 1), 100);
        assert_eq!(h.chain.supply_of(CREDIT_DENOM), 100);

        let snap = h.keeper.metrics().snapshot();
        assert_eq!(snap.credits_burned, 100);
        assert_eq!(snap.credits_minted, 200);
    }

    #[test]
    fn test_other_identifiers_are_ignored() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, EPOCH_SECS);
        h.keeper.lock(&ctx, &del(1), &val(1), 100).unwrap();
        h.keeper.before_epoch_start(&ctx, "day", 7).unwrap();
        h.keeper.after_epoch_end(&ctx, "week", 7).unwrap();
        assert_eq!(h.keeper.metrics().snapshot().credits_burned, 0);
    }

    #[test]
    fn test_epoch_end_completes_unlocking() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        h.keeper.lock(&ctx, &del(1), &val(1), 500).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 500).unwrap();
        h.chain.end_block(&h.ctx(2, UNBONDING_SECS));

        let end = h.ctx(3, 2 * EPOCH_SECS);
        h.keeper.after_epoch_end(&end, "tier", 2).unwrap();
        assert_eq!(h.keeper.store().iter_unlocking_lockups().count(), 0);
        assert_eq!(h.keeper.metrics().snapshot().unlockings_completed, 1);
    }

    #[test]
    fn test_epoch_end_error_propagates() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 0);
        h.keeper.lock(&ctx, &del(1), &val(1), 500).unwrap();
        h.keeper.unlock(&ctx, &del(1), &val(1), 500).unwrap();
        // Staking has not matured the entry, so custody holds nothing to release.
        let end = h.ctx(3, 2 * EPOCH_SECS);
        assert!(h.keeper.after_epoch_end(&end, "tier", 2).is_err());
    }
}
