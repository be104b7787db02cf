// crates/tier-economics/src/pools.rs
//
// Periodic processing of the module's staking rewards.
//
// Every `process_rewards_interval` blocks the module withdraws the rewards
// its delegations have accrued and splits them:
//   - developer_pool_fee_pct   -> developer pool
//   - insurance_pool_fee_pct   -> insurance pool, never above its threshold
//   - remainder                -> burned
//
// The insurance pool funded here is what the slashing adapter draws on to
// cover downtime slashes.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use tier_core::{
    checked_add, Amount, BlockContext, Coin, TierError, DEVELOPER_POOL_NAME, INSURANCE_POOL_NAME,
    MODULE_NAME,
};
use tier_store::KvStore;

use crate::keeper::Keeper;

/// Where one round of withdrawn rewards went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSplit {
    pub withdrawn: Amount,
    pub developer_fee: Amount,
    pub insurance_fee: Amount,
    pub burned: Amount,
}

fn percent_of(amount: Amount, pct: u32) -> Result<Amount, TierError> {
    amount
        .checked_mul(pct as Amount)
        .map(|v| v / 100)
        .ok_or_else(|| TierError::Overflow(format!("{} x {}%", amount, pct)))
}

impl<S: KvStore> Keeper<S> {
    /// Whether rewards are processed at `height`.
    pub fn is_rewards_block(&self, height: i64) -> Result<bool, TierError> {
        let interval = self.params()?.process_rewards_interval;
        Ok(height > 0 && interval > 0 && (height as u64) % interval == 0)
    }

    /// Run reward processing if `ctx.height` is a rewards block. Errors are
    /// logged and counted, never returned.
    pub fn maybe_process_rewards(&mut self, ctx: &BlockContext) -> Option<RewardSplit> {
        let due = match self.is_rewards_block(ctx.height) {
            Ok(due) => due,
            Err(e) => {
                self.metrics.record_internal_error();
                error!("Cannot read params for reward processing: {}", e);
                return None;
            }
        };
        if !due {
            return None;
        }
        match self.process_rewards(ctx) {
            Ok(split) => Some(split),
            Err(e) => {
                self.metrics.record_internal_error();
                error!("Reward processing failed at height {}: {}", ctx.height, e);
                None
            }
        }
    }

    /// Withdraw the module's delegation rewards and split them between the
    /// developer pool, the insurance pool, and the burn.
    pub fn process_rewards(&mut self, ctx: &BlockContext) -> Result<RewardSplit, TierError> {
        let params = self.params()?;
        let module = self.module_address();

        let mut withdrawn: Amount = 0;
        for validator in self.store.validators_with_lockups()? {
            let reward = self
                .distribution
                .withdraw_delegation_rewards(ctx, &module, &validator)?;
            debug!("Withdrew {} rewards from {}", reward, validator);
            withdrawn = checked_add(withdrawn, reward)?;
        }
        if withdrawn == 0 {
            return Ok(RewardSplit::default());
        }

        let denom = self.bond_denom();
        let developer_fee = percent_of(withdrawn, params.developer_pool_fee_pct)?;
        let pool_balance = self
            .bank
            .get_balance(&self.insurance_pool_address(), &denom)
            .amount;
        let room = params.insurance_pool_threshold.saturating_sub(pool_balance);
        let insurance_fee = percent_of(withdrawn, params.insurance_pool_fee_pct)?.min(room);
        let burned = withdrawn - developer_fee - insurance_fee;

        if developer_fee > 0 {
            self.bank.send_coins_from_module_to_module(
                MODULE_NAME,
                DEVELOPER_POOL_NAME,
                &Coin::new(denom.clone(), developer_fee),
            )?;
        }
        if insurance_fee > 0 {
            self.bank.send_coins_from_module_to_module(
                MODULE_NAME,
                INSURANCE_POOL_NAME,
                &Coin::new(denom.clone(), insurance_fee),
            )?;
        }
        if burned > 0 {
            self.bank
                .burn_coins(MODULE_NAME, &Coin::new(denom, burned))?;
        }

        self.metrics.record_rewards_processed();
        info!(
            "Processed {} rewards: developer {}, insurance {}, burned {}",
            withdrawn, developer_fee, insurance_fee, burned
        );
        Ok(RewardSplit {
            withdrawn,
            developer_fee,
            insurance_fee,
            burned,
        })
    }
}
