// crates/tier-core/src/traits.rs
//
// Narrow interfaces to the collaborators the tier keeper calls out to.
//
// Implementations live outside this crate (tier-sim provides an in-memory
// ledger). All methods take `&self`; implementations own their interior
// mutability, so one ledger can back several of these traits at once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::{AccAddress, ValAddress};
use crate::coin::{Amount, Coin};
use crate::context::BlockContext;
use crate::error::TierError;
use crate::validator::{Delegation, Validator};

/// Staking subsystem: validators, delegations, unbonding and redelegation.
pub trait StakingKeeper: Send + Sync {
    /// Denomination that can be bonded.
    fn bond_denom(&self) -> String;

    /// Look up a validator. Fails with `ValidatorNotFound` when unknown.
    fn get_validator(&self, validator: &ValAddress) -> Result<Validator, TierError>;

    /// Delegation of `delegator` to `validator`, if any.
    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>, TierError>;

    /// Bond `amount` from the delegator's spendable balance. Returns issued shares.
    fn delegate(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        amount: Amount,
        validator: &ValAddress,
    ) -> Result<Decimal, TierError>;

    /// Shares corresponding to `amount` tokens, checked against the delegation.
    fn validate_unbond_amount(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Decimal, TierError>;

    /// Begin unbonding `shares`. Returns (completion time, token amount unbonding).
    fn undelegate(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        shares: Decimal,
    ) -> Result<(DateTime<Utc>, Amount), TierError>;

    /// Move `shares` from `src` to `dst`. Returns the redelegation completion time.
    fn begin_redelegation(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Decimal,
    ) -> Result<DateTime<Utc>, TierError>;

    /// Re-bond `amount` of the unbonding entry created at `creation_height`.
    fn cancel_unbonding_delegation(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
        amount: Amount,
    ) -> Result<(), TierError>;
}

/// One (address, coin) pair from a full balance scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: AccAddress,
    pub coin: Coin,
}

/// Lazy sequence of balances. Each call to `iterate_all_balances` restarts it.
pub type BalanceIter<'a> = Box<dyn Iterator<Item = Balance> + 'a>;

/// Bank subsystem. Module accounts are addressed by module name.
pub trait BankKeeper: Send + Sync {
    fn get_balance(&self, address: &AccAddress, denom: &str) -> Coin;

    /// Every non-zero balance of every account, all denominations.
    fn iterate_all_balances(&self) -> BalanceIter<'_>;

    fn mint_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError>;

    fn burn_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError>;

    fn send_coins_from_account_to_module(
        &self,
        from: &AccAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), TierError>;

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), TierError>;

    fn send_coins_from_module_to_module(
        &self,
        from_module: &str,
        to_module: &str,
        coin: &Coin,
    ) -> Result<(), TierError>;

    /// Move funds an account intends to stake into module custody.
    fn delegate_coins_from_account_to_module(
        &self,
        from: &AccAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), TierError>;

    /// Release funds held in module custody back to an account.
    fn undelegate_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), TierError>;
}

/// Snapshot of an epoch tracked by the epoch service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    pub identifier: String,
    pub current_epoch: i64,
    pub current_epoch_start_time: DateTime<Utc>,
    pub duration: Duration,
}

/// Epoch subsystem (read side).
pub trait EpochsKeeper: Send + Sync {
    fn get_epoch_info(&self, identifier: &str) -> Result<EpochInfo, TierError>;
}

/// Boundary signal produced by the epoch subsystem when it advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochSignal {
    AfterEpochEnd { identifier: String, epoch_number: i64 },
    BeforeEpochStart { identifier: String, epoch_number: i64 },
}

/// Epoch subsystem (write side): advances epochs at block start.
pub trait EpochTicker: Send + Sync {
    /// Advance epoch clocks to `ctx.time`, returning the boundaries crossed in order.
    fn tick(&self, ctx: &BlockContext) -> Vec<EpochSignal>;
}

/// Hooks a module registers with the epoch subsystem. Implementations filter
/// on the identifier themselves; every hook sees every epoch.
pub trait EpochHooks {
    fn before_epoch_start(
        &mut self,
        ctx: &BlockContext,
        identifier: &str,
        epoch_number: i64,
    ) -> Result<(), TierError>;

    fn after_epoch_end(
        &mut self,
        ctx: &BlockContext,
        identifier: &str,
        epoch_number: i64,
    ) -> Result<(), TierError>;
}

/// Distribution subsystem: staking rewards accrued by delegations.
pub trait DistributionKeeper: Send + Sync {
    /// Pay out accrued rewards of a delegation to the delegator's balance.
    fn withdraw_delegation_rewards(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Amount, TierError>;
}
