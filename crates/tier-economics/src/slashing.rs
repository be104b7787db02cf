// crates/tier-economics/src/slashing.rs
//
// Slashing adapter: redistributes validator slashes across tier lockups.
//
// When a validator the module delegates to is slashed, the module's
// delegation loses a share of the burned tokens. That loss is spread over
// every lockup against the validator by scaling each one with the same
// slashing rate. Two causes are handled:
//
//   double_sign        punitive: lockups shrink, nothing is covered
//   missing_signature  downtime: the insurance pool delegates up to the
//                      module's loss back to the validator and the covered
//                      part is booked as insurance lockups
//
// Failures here never abort the block. The caller logs them, counts them in
// `internal_errors`, and moves on to the next event.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tier_core::event::{
    ATTRIBUTE_ADDRESS, ATTRIBUTE_BURNED_COINS, ATTRIBUTE_REASON, REASON_DOUBLE_SIGN,
    REASON_MISSING_SIGNATURE,
};
use tier_core::{
    amount_to_dec, dec_to_amount_ceil, dec_to_amount_floor, Amount, BlockContext, BlockEvent,
    Lockup, TierError, ValAddress,
};
use tier_store::KvStore;

use crate::events::TierEvent;
use crate::keeper::Keeper;

/// Cause attached to a slash event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashReason {
    DoubleSign,
    MissingSignature,
}

impl FromStr for SlashReason {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REASON_DOUBLE_SIGN => Ok(SlashReason::DoubleSign),
            REASON_MISSING_SIGNATURE => Ok(SlashReason::MissingSignature),
            other => Err(TierError::MalformedEvent(format!(
                "unknown slash reason '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SlashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlashReason::DoubleSign => f.write_str(REASON_DOUBLE_SIGN),
            SlashReason::MissingSignature => f.write_str(REASON_MISSING_SIGNATURE),
        }
    }
}

/// A parsed `slash` block event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashEvent {
    pub validator: ValAddress,
    pub reason: SlashReason,
    pub burned: Amount,
}

impl SlashEvent {
    /// Parse the address, reason and burned-coins attributes of `event`.
    pub fn parse(event: &BlockEvent) -> Result<Self, TierError> {
        if !event.is_slash() {
            return Err(TierError::MalformedEvent(format!(
                "expected slash event, got '{}'",
                event.kind
            )));
        }
        let attr = |key: &str| {
            event.attribute(key).ok_or_else(|| {
                TierError::MalformedEvent(format!("slash event has no '{}' attribute", key))
            })
        };
        let validator = ValAddress::from_bech32(attr(ATTRIBUTE_ADDRESS)?)?;
        let reason = attr(ATTRIBUTE_REASON)?.parse()?;
        let burned = parse_burned_coins(attr(ATTRIBUTE_BURNED_COINS)?)?;
        Ok(Self {
            validator,
            reason,
            burned,
        })
    }
}

/// Accepts a bare integer (`"1500"`) or an integer with a denom suffix (`"1500uopen"`).
fn parse_burned_coins(value: &str) -> Result<Amount, TierError> {
    let value = value.trim();
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, denom) = value.split_at(digits_end);
    if digits.is_empty() || !denom.chars().all(|c| c.is_ascii_alphanumeric() || c == '/') {
        return Err(TierError::MalformedEvent(format!(
            "burned_coins '{}' is not an amount",
            value
        )));
    }
    digits
        .parse()
        .map_err(|_| TierError::MalformedEvent(format!("burned_coins '{}' overflows", value)))
}

/// What a processed slash did to the module's lockups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashOutcome {
    pub validator: ValAddress,
    pub reason: SlashReason,
    /// Module's portion of the burned tokens (not truncated).
    pub module_share: Decimal,
    pub slashing_rate: Decimal,
    pub coverage_rate: Decimal,
    /// Tokens delegated from the insurance pool.
    pub covered: Amount,
    pub lockups_adjusted: u64,
}

/// Per-block summary of the adapter's work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashReport {
    pub processed: u64,
    pub failed: u64,
}

/// One lockup's planned change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockupAdjustment {
    lockup: Lockup,
    new_amount: Amount,
    insurance: Amount,
}

fn checked_rate(numerator: Decimal, denominator: Decimal) -> Result<Decimal, TierError> {
    numerator
        .checked_div(denominator)
        .ok_or_else(|| TierError::Overflow(format!("{} / {}", numerator, denominator)))
}

fn mul_floor(amount: Amount, rate: Decimal) -> Result<Amount, TierError> {
    let product = amount_to_dec(amount)?
        .checked_mul(rate)
        .ok_or_else(|| TierError::Overflow(format!("{} x {}", amount, rate)))?;
    dec_to_amount_floor(product)
}

impl<S: KvStore> Keeper<S> {
    /// Feed one block's events to the adapter. Non-slash events are ignored;
    /// a slash event that cannot be processed is logged and counted.
    pub fn handle_slashing_events(&mut self, ctx: &BlockContext, events: &[BlockEvent]) -> SlashReport {
        let mut report = SlashReport::default();
        for event in events.iter().filter(|e| e.is_slash()) {
            let result = SlashEvent::parse(event).and_then(|slash| self.process_slash_event(ctx, &slash));
            match result {
                Ok(outcome) => {
                    report.processed += 1;
                    debug!(
                        "Slash on {} adjusted {} lockups",
                        outcome.validator, outcome.lockups_adjusted
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    self.metrics.record_slash_skipped();
                    self.metrics.record_internal_error();
                    warn!("Skipping slash event at height {}: {}", ctx.height, e);
                }
            }
        }
        report
    }

    /// Redistribute one slash over the lockups of its validator.
    pub fn process_slash_event(
        &mut self,
        ctx: &BlockContext,
        slash: &SlashEvent,
    ) -> Result<SlashOutcome, TierError> {
        let validator = self.staking.get_validator(&slash.validator)?;
        if validator.tokens == 0 {
            return Err(TierError::InvalidRequest(format!(
                "validator {} has no stake",
                slash.validator
            )));
        }
        let module = self.module_address();
        let delegation = self
            .staking
            .get_delegation(&module, &slash.validator)?
            .ok_or_else(|| {
                TierError::NotFound(format!(
                    "module has no delegation to {}",
                    slash.validator
                ))
            })?;
        let module_stake = validator.tokens_from_shares(delegation.shares)?;
        if module_stake.is_zero() {
            return Err(TierError::InvalidRequest(format!(
                "module stake with {} is zero",
                slash.validator
            )));
        }
        let total_stake = amount_to_dec(validator.tokens)?;
        let module_share = amount_to_dec(slash.burned)?
            .checked_mul(module_stake)
            .and_then(|v| v.checked_div(total_stake))
            .ok_or_else(|| {
                TierError::Overflow(format!(
                    "{} x {} / {}",
                    slash.burned, module_stake, total_stake
                ))
            })?;

        let (slashing_rate, coverage_rate, covered) = match slash.reason {
            SlashReason::DoubleSign => {
                let rate = checked_rate(module_stake - module_share, module_stake)?;
                (rate, Decimal::ZERO, 0)
            }
            SlashReason::MissingSignature => {
                let share_ceil = dec_to_amount_ceil(module_share)?;
                let pool = self.insurance_pool_address();
                let pool_balance = self.bank.get_balance(&pool, &self.bond_denom()).amount;
                let covered = share_ceil.min(pool_balance);
                let rate = checked_rate(module_stake - amount_to_dec(share_ceil)?, module_stake)?;
                let coverage = checked_rate(amount_to_dec(covered)?, module_stake)?;
                (rate, coverage, covered)
            }
        };
        let slashing_rate = slashing_rate.max(Decimal::ZERO).min(Decimal::ONE);

        // Plan every change first so nothing is delegated or written if the
        // arithmetic fails part way.
        let plan = self.plan_adjustments(&slash.validator, slashing_rate, coverage_rate)?;
        if covered > 0 {
            let pool = self.insurance_pool_address();
            self.staking.delegate(ctx, &pool, covered, &slash.validator)?;
        }
        let lockups_adjusted = self.apply_adjustments(plan)?;

        self.metrics.record_slash_processed();
        self.emit(TierEvent::SlashRedistributed {
            validator: slash.validator.clone(),
            reason: slash.reason.to_string(),
            module_share: module_share.to_string(),
            covered,
            lockups_adjusted,
        });
        info!(
            "Slash ({}) on {}: module share {}, rate {}, covered {}",
            slash.reason, slash.validator, module_share, slashing_rate, covered
        );
        Ok(SlashOutcome {
            validator: slash.validator.clone(),
            reason: slash.reason,
            module_share,
            slashing_rate,
            coverage_rate,
            covered,
            lockups_adjusted,
        })
    }

    /// Scale every lockup against `validator` by `slashing_rate`, and add
    /// `floor(amount x coverage_rate)` to the matching insurance lockups when
    /// `coverage_rate` is positive. Returns the number of lockups touched.
    pub fn adjust_lockups(
        &mut self,
        validator: &ValAddress,
        slashing_rate: Decimal,
        coverage_rate: Decimal,
    ) -> Result<u64, TierError> {
        let plan = self.plan_adjustments(validator, slashing_rate, coverage_rate)?;
        self.apply_adjustments(plan)
    }

    fn plan_adjustments(
        &self,
        validator: &ValAddress,
        slashing_rate: Decimal,
        coverage_rate: Decimal,
    ) -> Result<Vec<LockupAdjustment>, TierError> {
        let slashing_rate = slashing_rate.max(Decimal::ZERO);
        self.store
            .lockups_by_validator(validator)?
            .into_iter()
            .map(|lockup| {
                let new_amount = mul_floor(lockup.amount, slashing_rate)?.min(lockup.amount);
                let insurance = if coverage_rate > Decimal::ZERO {
                    mul_floor(lockup.amount, coverage_rate)?
                } else {
                    0
                };
                Ok(LockupAdjustment {
                    lockup,
                    new_amount,
                    insurance,
                })
            })
            .collect()
    }

    fn apply_adjustments(&mut self, plan: Vec<LockupAdjustment>) -> Result<u64, TierError> {
        let mut adjusted = 0u64;
        for adj in plan {
            let Lockup {
                delegator,
                validator,
                amount,
            } = adj.lockup;
            debug!(
                "Lockup {}/{}: {} -> {} (+{} insured)",
                delegator, validator, amount, adj.new_amount, adj.insurance
            );
            self.store.set_lockup(&delegator, &validator, adj.new_amount)?;
            if adj.insurance > 0 {
                self.store
                    .add_insurance_lockup(&delegator, &validator, adj.insurance)?;
            }
            adjusted += 1;
        }
        Ok(adjusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::test_support::*;
    use rust_decimal_macros::dec;
    use tier_core::event::EVENT_TYPE_SLASH;
    use tier_core::{StakingKeeper, DEFAULT_BOND_DENOM, INSURANCE_POOL_NAME};

    fn slash_event(validator: &ValAddress, reason: &str, burned: &str) -> BlockEvent {
        BlockEvent::new(EVENT_TYPE_SLASH)
            .with_attribute(ATTRIBUTE_ADDRESS, validator.to_string())
            .with_attribute(ATTRIBUTE_REASON, reason)
            .with_attribute(ATTRIBUTE_BURNED_COINS, burned)
    }

    /// Three delegators lock 1M, 2M and 3M with validator 1, whose self-bond
    /// is 1M. The module holds 6M of the validator's 7M.
    fn harness_with_lockups() -> Harness {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 1_000_000).unwrap();
        h.keeper.lock(&ctx, &del(2), &val(1), 2_000_000).unwrap();
        h.keeper.lock(&ctx, &del(3), &val(1), 3_000_000).unwrap();
        h
    }

    fn lockup_sum(h: &Harness, v: &ValAddress) -> Amount {
        h.keeper.store().total_amount_by_validator(v).unwrap()
    }

    #[test]
    fn test_parse_slash_event() {
        let event = slash_event(&val(1), "double_sign", "1500uopen");
        let parsed = SlashEvent::parse(&event).unwrap();
        assert_eq!(parsed.validator, val(1));
        assert_eq!(parsed.reason, SlashReason::DoubleSign);
        assert_eq!(parsed.burned, 1500);

        let bare = slash_event(&val(1), "missing_signature", "42");
        assert_eq!(SlashEvent::parse(&bare).unwrap().burned, 42);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let cases = vec![
            slash_event(&val(1), "bribery", "10"),
            slash_event(&val(1), "double_sign", "ten"),
            slash_event(&val(1), "double_sign", "-10"),
            BlockEvent::new(EVENT_TYPE_SLASH).with_attribute(ATTRIBUTE_REASON, "double_sign"),
            BlockEvent::new(EVENT_TYPE_SLASH)
                .with_attribute(ATTRIBUTE_ADDRESS, "not-an-address")
                .with_attribute(ATTRIBUTE_REASON, "double_sign")
                .with_attribute(ATTRIBUTE_BURNED_COINS, "10"),
        ];
        for event in cases {
            assert!(SlashEvent::parse(&event).is_err(), "accepted {:?}", event);
        }
    }

    #[test]
    fn test_double_sign_scales_lockups() {
        let mut h = harness_with_lockups();
        let ctx = h.ctx(2, 20);
        // 7% of the validator's 7M burned: the module's share is 420_000.
        let event = SlashEvent {
            validator: val(1),
            reason: SlashReason::DoubleSign,
            burned: 490_000,
        };
        let outcome = h.keeper.process_slash_event(&ctx, &event).unwrap();

        assert_eq!(outcome.module_share, dec!(420000));
        assert_eq!(outcome.slashing_rate, dec!(0.93));
        assert_eq!(outcome.covered, 0);
        assert_eq!(outcome.lockups_adjusted, 3);

        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 930_000);
        assert_eq!(h.keeper.store().lockup_amount(&del(2), &val(1)).unwrap(), 1_860_000);
        assert_eq!(h.keeper.store().lockup_amount(&del(3), &val(1)).unwrap(), 2_790_000);
        assert_eq!(h.keeper.store().iter_insurance_lockups().count(), 0);
    }

    #[test]
    fn test_double_sign_conservation_with_truncation() {
        let mut h = Harness::new();
        let ctx = h.ctx(1, 10);
        h.keeper.lock(&ctx, &del(1), &val(1), 333_333).unwrap();
        h.keeper.lock(&ctx, &del(2), &val(1), 333_333).unwrap();
        h.keeper.lock(&ctx, &del(3), &val(1), 333_334).unwrap();
        let before = lockup_sum(&h, &val(1));

        let event = SlashEvent {
            validator: val(1),
            reason: SlashReason::DoubleSign,
            burned: 77_777,
        };
        let outcome = h.keeper.process_slash_event(&h.ctx(2, 20), &event).unwrap();
        let reduction = before - lockup_sum(&h, &val(1));
        let expected = dec_to_amount_floor(outcome.module_share).unwrap();
        assert!(reduction.abs_diff(expected) <= 3, "{} vs {}", reduction, expected);
    }

    #[test]
    fn test_missing_signature_with_full_coverage() {
        let mut h = harness_with_lockups();
        h.chain
            .fund_module(INSURANCE_POOL_NAME, 10_000_000)
            .unwrap();
        let ctx = h.ctx(2, 20);
        let event = SlashEvent {
            validator: val(1),
            reason: SlashReason::MissingSignature,
            burned: 70_000,
        };
        let outcome = h.keeper.process_slash_event(&ctx, &event).unwrap();

        assert_eq!(outcome.module_share, dec!(60000));
        assert_eq!(outcome.covered, 60_000);
        assert_eq!(outcome.slashing_rate, dec!(0.99));

        let insured: Amount = h
            .keeper
            .store()
            .iter_insurance_lockups()
            .map(|r| r.unwrap().amount)
            .sum();
        assert_eq!(insured, 60_000);
        assert_eq!(lockup_sum(&h, &val(1)), 5_940_000);

        let pool = h.keeper.insurance_pool_address();
        assert!(h.chain.get_delegation(&pool, &val(1)).unwrap().is_some());
        assert_eq!(
            h.chain.get_balance_of(&pool, DEFAULT_BOND_DENOM),
            10_000_000 - 60_000
        );
    }

    #[test]
    fn test_missing_signature_with_partial_coverage() {
        let mut h = harness_with_lockups();
        h.chain.fund_module(INSURANCE_POOL_NAME, 30_000).unwrap();
        let event = SlashEvent {
            validator: val(1),
            reason: SlashReason::MissingSignature,
            burned: 70_000,
        };
        let outcome = h.keeper.process_slash_event(&h.ctx(2, 20), &event).unwrap();
        assert_eq!(outcome.covered, 30_000);
        assert_eq!(outcome.coverage_rate, dec!(0.005));
        assert_eq!(
            h.keeper
                .store()
                .get_insurance_lockup(&del(3), &val(1))
                .unwrap()
                .unwrap()
                .amount,
            15_000
        );
    }

    #[test]
    fn test_missing_signature_without_pool_funds() {
        let mut h = harness_with_lockups();
        let event = SlashEvent {
            validator: val(1),
            reason: SlashReason::MissingSignature,
            burned: 70_000,
        };
        let outcome = h.keeper.process_slash_event(&h.ctx(2, 20), &event).unwrap();
        assert_eq!(outcome.covered, 0);
        assert_eq!(outcome.coverage_rate, Decimal::ZERO);
        assert_eq!(h.keeper.store().iter_insurance_lockups().count(), 0);
        assert_eq!(lockup_sum(&h, &val(1)), 5_940_000);
    }

    #[test]
    fn test_event_for_validator_without_module_stake_is_skipped() {
        let mut h = harness_with_lockups();
        let ctx = h.ctx(2, 20);
        let events = vec![
            slash_event(&val(2), "double_sign", "100"),
            slash_event(&val(1), "bribery", "100"),
            BlockEvent::new("transfer"),
            slash_event(&val(1), "double_sign", "70000"),
        ];
        let report = h.keeper.handle_slashing_events(&ctx, &events);
        assert_eq!(report, SlashReport { processed: 1, failed: 2 });

        let snap = h.keeper.metrics().snapshot();
        assert_eq!(snap.internal_errors, 2);
        assert_eq!(snap.slash_events_skipped, 2);
        assert_eq!(snap.slash_events_processed, 1);
    }

    #[test]
    fn test_adjust_lockups_only_touches_validator() {
        let mut h = harness_with_lockups();
        let ctx = h.ctx(1, 10);
        h.keeper.lock(&ctx, &del(1), &val(2), 500).unwrap();
        let touched = h
            .keeper
            .adjust_lockups(&val(1), dec!(0.5), Decimal::ZERO)
            .unwrap();
        assert_eq!(touched, 3);
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(1)).unwrap(), 500_000);
        assert_eq!(h.keeper.store().lockup_amount(&del(1), &val(2)).unwrap(), 500);
    }

    #[test]
    fn test_full_slash_removes_lockups() {
        let mut h = harness_with_lockups();
        h.keeper
            .adjust_lockups(&val(1), Decimal::ZERO, Decimal::ZERO)
            .unwrap();
        assert_eq!(lockup_sum(&h, &val(1)), 0);
        assert!(h.keeper.store().get_lockup(&del(1), &val(1)).unwrap().is_none());
    }
}
