// crates/tier-sim/src/chain.rs
//
// `SimChain`: an in-memory staking/bank/distribution ledger.
//
// Behaviour follows the usual proof-of-stake conventions closely enough for
// the tier module to be exercised end to end:
//   - delegating debits the delegator's spendable balance
//   - undelegating moves tokens into an unbonding entry keyed by
//     (delegator, validator, creation height) that pays out at begin_block
//     or end_block, whichever first sees its completion time passed
//   - slashes are announced immediately as `slash` block events and their
//     burn is applied at end_block
//   - module accounts live at `module_address(name)`
//
// State sits behind a single `parking_lot::RwLock`, so the ledger can be
// shared as `Arc<SimChain>` behind several collaborator traits at once.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info};

use tier_core::event::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_BURNED_COINS, ATTRIBUTE_REASON, EVENT_TYPE_SLASH,
};
use tier_core::{
    amount_to_dec, checked_add, dec_to_amount_floor, module_address, AccAddress, Amount, Balance,
    BalanceIter, BankKeeper, BlockContext, BlockEvent, Coin, Delegation, DistributionKeeper,
    StakingKeeper, TierError, ValAddress, Validator, DEFAULT_BOND_DENOM,
};

/// Tokens on their way out of a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbondingEntry {
    pub balance: Amount,
    pub completion_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingSlash {
    validator: ValAddress,
    burned: Amount,
}

#[derive(Debug, Default)]
struct ChainState {
    balances: BTreeMap<(AccAddress, String), Amount>,
    supply: BTreeMap<String, Amount>,
    validators: BTreeMap<ValAddress, Validator>,
    delegations: BTreeMap<(AccAddress, ValAddress), Decimal>,
    unbonding: BTreeMap<(AccAddress, ValAddress, i64), UnbondingEntry>,
    rewards: BTreeMap<(AccAddress, ValAddress), Amount>,
    pending_slashes: Vec<PendingSlash>,
}

impl ChainState {
    fn balance(&self, addr: &AccAddress, denom: &str) -> Amount {
        self.balances
            .get(&(addr.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, addr: &AccAddress, denom: &str, amount: Amount) -> Result<(), TierError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self
            .balances
            .entry((addr.clone(), denom.to_string()))
            .or_insert(0);
        *entry = checked_add(*entry, amount)?;
        Ok(())
    }

    fn debit(&mut self, addr: &AccAddress, denom: &str, amount: Amount) -> Result<(), TierError> {
        if amount == 0 {
            return Ok(());
        }
        let key = (addr.clone(), denom.to_string());
        let current = self.balances.get(&key).copied().unwrap_or(0);
        if current < amount {
            return Err(TierError::InsufficientFunds(format!(
                "{} has {}{}, needs {}{}",
                addr, current, denom, amount, denom
            )));
        }
        if current == amount {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, current - amount);
        }
        Ok(())
    }

    fn transfer(&mut self, from: &AccAddress, to: &AccAddress, coin: &Coin) -> Result<(), TierError> {
        self.debit(from, &coin.denom, coin.amount)?;
        self.credit(to, &coin.denom, coin.amount)
    }

    fn mint(&mut self, to: &AccAddress, coin: &Coin) -> Result<(), TierError> {
        self.credit(to, &coin.denom, coin.amount)?;
        let supply = self.supply.entry(coin.denom.clone()).or_insert(0);
        *supply = checked_add(*supply, coin.amount)?;
        Ok(())
    }

    fn burn(&mut self, from: &AccAddress, coin: &Coin) -> Result<(), TierError> {
        self.debit(from, &coin.denom, coin.amount)?;
        let supply = self.supply.entry(coin.denom.clone()).or_insert(0);
        *supply = supply.saturating_sub(coin.amount);
        Ok(())
    }

    fn validator_mut(&mut self, addr: &ValAddress) -> Result<&mut Validator, TierError> {
        self.validators
            .get_mut(addr)
            .ok_or_else(|| TierError::ValidatorNotFound(addr.to_string()))
    }

    /// Bond `amount` tokens to `validator` without touching balances.
    fn bond(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Decimal, TierError> {
        let v = self.validator_mut(validator)?;
        let shares = v.shares_from_tokens(amount)?;
        v.tokens = checked_add(v.tokens, amount)?;
        v.delegator_shares += shares;
        *self
            .delegations
            .entry((delegator.clone(), validator.clone()))
            .or_insert(Decimal::ZERO) += shares;
        Ok(shares)
    }

    /// Remove `shares` from a delegation. Returns the tokens they were worth.
    fn unbond(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        shares: Decimal,
    ) -> Result<Amount, TierError> {
        let key = (delegator.clone(), validator.clone());
        let held = self.delegations.get(&key).copied().ok_or_else(|| {
            TierError::NotFound(format!(
                "delegation of {} to {}",
                delegator, validator
            ))
        })?;
        if shares <= Decimal::ZERO || shares > held {
            return Err(TierError::Staking(format!(
                "cannot unbond {} shares from delegation of {} ({} to {})",
                shares, held, delegator, validator
            )));
        }
        let v = self.validator_mut(validator)?;
        let tokens = dec_to_amount_floor(v.tokens_from_shares(shares)?)?.min(v.tokens);
        v.tokens -= tokens;
        v.delegator_shares -= shares;

        let remaining = held - shares;
        if remaining.is_zero() {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key, remaining);
        }
        Ok(tokens)
    }
}

/// In-memory ledger implementing the staking, bank and distribution traits.
#[derive(Debug)]
pub struct SimChain {
    bond_denom: String,
    unbonding_time: Duration,
    state: RwLock<ChainState>,
}

impl SimChain {
    pub fn new(unbonding_time: Duration) -> Self {
        Self {
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            unbonding_time,
            state: RwLock::new(ChainState::default()),
        }
    }

    pub fn unbonding_time(&self) -> Duration {
        self.unbonding_time
    }

    /// Register a validator with a self-bond minted for its operator account.
    pub fn add_validator(&self, operator: &ValAddress, self_bond: Amount) -> Result<(), TierError> {
        let mut state = self.state.write();
        if state.validators.contains_key(operator) {
            return Err(TierError::InvalidRequest(format!(
                "validator {} already exists",
                operator
            )));
        }
        state.validators.insert(
            operator.clone(),
            Validator {
                operator: operator.clone(),
                tokens: 0,
                delegator_shares: Decimal::ZERO,
                jailed: false,
            },
        );
        if self_bond > 0 {
            let account = AccAddress::from_bytes(operator.as_bytes());
            let coin = Coin::new(self.bond_denom.clone(), self_bond);
            state.mint(&account, &coin)?;
            state.debit(&account, &coin.denom, self_bond)?;
            state.bond(&account, operator, self_bond)?;
        }
        info!("Sim validator {} bonded {}", operator, self_bond);
        Ok(())
    }

    /// Mint bond-denom tokens to an account.
    pub fn fund(&self, account: &AccAddress, amount: Amount) -> Result<(), TierError> {
        let coin = Coin::new(self.bond_denom.clone(), amount);
        self.state.write().mint(account, &coin)
    }

    /// Mint bond-denom tokens to a module account.
    pub fn fund_module(&self, module: &str, amount: Amount) -> Result<(), TierError> {
        self.fund(&module_address(module), amount)
    }

    pub fn get_balance_of(&self, account: &AccAddress, denom: &str) -> Amount {
        self.state.read().balance(account, denom)
    }

    /// Plain account-to-account transfer.
    pub fn transfer(&self, from: &AccAddress, to: &AccAddress, coin: &Coin) -> Result<(), TierError> {
        self.state.write().transfer(from, to, coin)
    }

    pub fn supply_of(&self, denom: &str) -> Amount {
        self.state.read().supply.get(denom).copied().unwrap_or(0)
    }

    pub fn validators(&self) -> Vec<Validator> {
        self.state.read().validators.values().cloned().collect()
    }

    /// Pending unbonding entries of a delegator with a validator, by creation height.
    pub fn unbonding_entries(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Vec<(i64, UnbondingEntry)> {
        self.state
            .read()
            .unbonding
            .iter()
            .filter(|((d, v, _), _)| d == delegator && v == validator)
            .map(|((_, _, h), e)| (*h, e.clone()))
            .collect()
    }

    /// Credit rewards to one delegation, withdrawable later.
    pub fn accrue_rewards(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<(), TierError> {
        let mut state = self.state.write();
        if !state.validators.contains_key(validator) {
            return Err(TierError::ValidatorNotFound(validator.to_string()));
        }
        let entry = state
            .rewards
            .entry((delegator.clone(), validator.clone()))
            .or_insert(0);
        *entry = checked_add(*entry, amount)?;
        Ok(())
    }

    /// Accrue `rate_ppm` parts-per-million of each delegation's token value.
    pub fn accrue_block_rewards(&self, rate_ppm: u64) -> Result<(), TierError> {
        let mut state = self.state.write();
        let rate = Decimal::new(rate_ppm as i64, 6);
        let mut accrued = Vec::new();
        for ((delegator, validator), shares) in &state.delegations {
            let Some(v) = state.validators.get(validator) else {
                continue;
            };
            let tokens = v.tokens_from_shares(*shares)?;
            let reward = tokens
                .checked_mul(rate)
                .ok_or_else(|| TierError::Overflow(format!("{} x {}", tokens, rate)))?;
            let reward = dec_to_amount_floor(reward)?;
            if reward > 0 {
                accrued.push(((delegator.clone(), validator.clone()), reward));
            }
        }
        for (key, reward) in accrued {
            let entry = state.rewards.entry(key).or_insert(0);
            *entry = checked_add(*entry, reward)?;
        }
        Ok(())
    }

    /// Slash `fraction` of a validator's tokens.
    ///
    /// Returns the `slash` event announcing the burn. The burn itself lands
    /// at the next `end_block`, so event consumers in the same block still see
    /// the pre-slash validator.
    pub fn slash(
        &self,
        validator: &ValAddress,
        fraction: Decimal,
        reason: &str,
    ) -> Result<BlockEvent, TierError> {
        let mut state = self.state.write();
        let v = state.validator_mut(validator)?;
        let fraction = fraction.max(Decimal::ZERO).min(Decimal::ONE);
        let tokens = amount_to_dec(v.tokens)?;
        let burned = tokens
            .checked_mul(fraction)
            .ok_or_else(|| TierError::Overflow(format!("{} x {}", tokens, fraction)))?;
        let burned = dec_to_amount_floor(burned)?;
        state.pending_slashes.push(PendingSlash {
            validator: validator.clone(),
            burned,
        });
        info!("Sim slash of {} on {} ({})", burned, validator, reason);
        Ok(BlockEvent::new(EVENT_TYPE_SLASH)
            .with_attribute(ATTRIBUTE_ADDRESS, validator.to_string())
            .with_attribute(ATTRIBUTE_REASON, reason)
            .with_attribute(ATTRIBUTE_BURNED_COINS, burned.to_string()))
    }

    /// Pay out unbonding entries that have matured by `ctx.time`, before any
    /// module hook of the block runs. Returns the number of entries paid out.
    pub fn begin_block(&self, ctx: &BlockContext) -> usize {
        let mut guard = self.state.write();
        self.pay_matured(&mut guard, ctx)
    }

    /// Apply pending slashes and pay out matured unbonding entries.
    /// Returns the number of entries paid out.
    pub fn end_block(&self, ctx: &BlockContext) -> usize {
        let mut guard = self.state.write();
        let state: &mut ChainState = &mut guard;

        let slashes = std::mem::take(&mut state.pending_slashes);
        for slash in slashes {
            if let Some(v) = state.validators.get_mut(&slash.validator) {
                let burned = slash.burned.min(v.tokens);
                v.tokens -= burned;
                if let Some(supply) = state.supply.get_mut(&self.bond_denom) {
                    *supply = supply.saturating_sub(burned);
                }
                debug!("Applied slash of {} on {}", burned, slash.validator);
            }
        }

        self.pay_matured(state, ctx)
    }

    fn pay_matured(&self, state: &mut ChainState, ctx: &BlockContext) -> usize {
        let matured: Vec<(AccAddress, ValAddress, i64)> = state
            .unbonding
            .iter()
            .filter(|(_, e)| e.completion_time <= ctx.time)
            .map(|(k, _)| k.clone())
            .collect();
        let mut paid = 0;
        for key in matured {
            if let Some(entry) = state.unbonding.remove(&key) {
                // Credit cannot overflow for balances already in supply.
                if state.credit(&key.0, &self.bond_denom, entry.balance).is_ok() {
                    paid += 1;
                }
            }
        }
        paid
    }
}

impl StakingKeeper for SimChain {
    fn bond_denom(&self) -> String {
        self.bond_denom.clone()
    }

    fn get_validator(&self, validator: &ValAddress) -> Result<Validator, TierError> {
        self.state
            .read()
            .validators
            .get(validator)
            .cloned()
            .ok_or_else(|| TierError::ValidatorNotFound(validator.to_string()))
    }

    fn get_delegation(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>, TierError> {
        Ok(self
            .state
            .read()
            .delegations
            .get(&(delegator.clone(), validator.clone()))
            .map(|shares| Delegation {
                delegator: delegator.clone(),
                validator: validator.clone(),
                shares: *shares,
            }))
    }

    fn delegate(
        &self,
        _ctx: &BlockContext,
        delegator: &AccAddress,
        amount: Amount,
        validator: &ValAddress,
    ) -> Result<Decimal, TierError> {
        if amount == 0 {
            return Err(TierError::InvalidAmount("delegation of 0".to_string()));
        }
        let mut state = self.state.write();
        if !state.validators.contains_key(validator) {
            return Err(TierError::ValidatorNotFound(validator.to_string()));
        }
        state.debit(delegator, &self.bond_denom, amount)?;
        state.bond(delegator, validator, amount)
    }

    fn validate_unbond_amount(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Decimal, TierError> {
        let state = self.state.read();
        let v = state
            .validators
            .get(validator)
            .ok_or_else(|| TierError::ValidatorNotFound(validator.to_string()))?;
        let held = state
            .delegations
            .get(&(delegator.clone(), validator.clone()))
            .copied()
            .ok_or_else(|| {
                TierError::NotFound(format!("delegation of {} to {}", delegator, validator))
            })?;
        let shares = v.shares_from_tokens(amount)?;
        if shares > held {
            return Err(TierError::Staking(format!(
                "{} tokens ({} shares) exceed delegation of {} shares",
                amount, shares, held
            )));
        }
        Ok(shares)
    }

    fn undelegate(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        shares: Decimal,
    ) -> Result<(DateTime<Utc>, Amount), TierError> {
        let completion_time = ctx.time
            + chrono::Duration::from_std(self.unbonding_time)
                .map_err(|e| TierError::Staking(format!("unbonding time: {}", e)))?;
        let mut state = self.state.write();
        let tokens = state.unbond(delegator, validator, shares)?;
        let entry = state
            .unbonding
            .entry((delegator.clone(), validator.clone(), ctx.height))
            .or_insert(UnbondingEntry {
                balance: 0,
                completion_time,
            });
        entry.balance = checked_add(entry.balance, tokens)?;
        entry.completion_time = completion_time;
        Ok((completion_time, tokens))
    }

    fn begin_redelegation(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Decimal,
    ) -> Result<DateTime<Utc>, TierError> {
        if src == dst {
            return Err(TierError::Staking(format!(
                "self redelegation to {}",
                src
            )));
        }
        let completion_time = ctx.time
            + chrono::Duration::from_std(self.unbonding_time)
                .map_err(|e| TierError::Staking(format!("unbonding time: {}", e)))?;
        let mut state = self.state.write();
        if !state.validators.contains_key(dst) {
            return Err(TierError::ValidatorNotFound(dst.to_string()));
        }
        let tokens = state.unbond(delegator, src, shares)?;
        if tokens > 0 {
            state.bond(delegator, dst, tokens)?;
        }
        Ok(completion_time)
    }

    fn cancel_unbonding_delegation(
        &self,
        ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
        amount: Amount,
    ) -> Result<(), TierError> {
        let mut state = self.state.write();
        let key = (delegator.clone(), validator.clone(), creation_height);
        let entry = state.unbonding.get(&key).cloned().ok_or_else(|| {
            TierError::NotFound(format!(
                "unbonding entry of {} with {} at height {}",
                delegator, validator, creation_height
            ))
        })?;
        if entry.completion_time <= ctx.time {
            return Err(TierError::Staking(format!(
                "unbonding entry at height {} already completed",
                creation_height
            )));
        }
        if amount == 0 || amount > entry.balance {
            return Err(TierError::InvalidAmount(format!(
                "cannot cancel {} of unbonding entry holding {}",
                amount, entry.balance
            )));
        }
        state.bond(delegator, validator, amount)?;
        if amount == entry.balance {
            state.unbonding.remove(&key);
        } else if let Some(e) = state.unbonding.get_mut(&key) {
            e.balance -= amount;
        }
        Ok(())
    }
}

impl BankKeeper for SimChain {
    fn get_balance(&self, address: &AccAddress, denom: &str) -> Coin {
        Coin::new(denom, self.state.read().balance(address, denom))
    }

    fn iterate_all_balances(&self) -> BalanceIter<'_> {
        let snapshot: Vec<Balance> = self
            .state
            .read()
            .balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((address, denom), amount)| Balance {
                address: address.clone(),
                coin: Coin::new(denom.clone(), *amount),
            })
            .collect();
        Box::new(snapshot.into_iter())
    }

    fn mint_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError> {
        self.state.write().mint(&module_address(module), coin)
    }

    fn burn_coins(&self, module: &str, coin: &Coin) -> Result<(), TierError> {
        self.state.write().burn(&module_address(module), coin)
    }

    fn send_coins_from_account_to_module(
        &self,
        from: &AccAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), TierError> {
        self.state
            .write()
            .transfer(from, &module_address(module), coin)
    }

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), TierError> {
        self.state.write().transfer(&module_address(module), to, coin)
    }

    fn send_coins_from_module_to_module(
        &self,
        from_module: &str,
        to_module: &str,
        coin: &Coin,
    ) -> Result<(), TierError> {
        self.state
            .write()
            .transfer(&module_address(from_module), &module_address(to_module), coin)
    }

    fn delegate_coins_from_account_to_module(
        &self,
        from: &AccAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), TierError> {
        self.send_coins_from_account_to_module(from, module, coin)
    }

    fn undelegate_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), TierError> {
        self.send_coins_from_module_to_account(module, to, coin)
    }
}

impl DistributionKeeper for SimChain {
    fn withdraw_delegation_rewards(
        &self,
        _ctx: &BlockContext,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Amount, TierError> {
        let mut state = self.state.write();
        if !state.validators.contains_key(validator) {
            return Err(TierError::ValidatorNotFound(validator.to_string()));
        }
        let reward = state
            .rewards
            .remove(&(delegator.clone(), validator.clone()))
            .unwrap_or(0);
        if reward > 0 {
            state.mint(delegator, &Coin::new(self.bond_denom.clone(), reward))?;
        }
        Ok(reward)
    }
}
