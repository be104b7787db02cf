// crates/tier-economics/src/params.rs
//
// Governance-mutable parameters of the tier module.
//
// Reward tiers are ordered by threshold, highest first, and end with a
// catch-all tier at threshold zero. Rates are integer percentages:
// 150 means 1.50 credit per staked unit.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tier_core::{Amount, TierError};

/// One row of the reward table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Stake level at which this rate starts to apply.
    pub amount_threshold: Amount,
    /// Credit per staked unit, in percent.
    pub rate_pct: i64,
}

impl Rate {
    pub const fn new(amount_threshold: Amount, rate_pct: i64) -> Self {
        Self {
            amount_threshold,
            rate_pct,
        }
    }

    /// The rate as a decimal multiplier (150 -> 1.50).
    pub fn multiplier(&self) -> Decimal {
        Decimal::new(self.rate_pct, 2)
    }
}

/// Module parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Length of one tier epoch.
    #[serde(with = "duration_secs", default = "default_epoch_duration")]
    pub epoch_duration: Duration,
    /// Epochs an unlock waits before funds are released.
    #[serde(default = "default_unlocking_epochs")]
    pub unlocking_epochs: u32,
    /// Reward table, highest threshold first.
    #[serde(default = "default_reward_rates")]
    pub reward_rates: Vec<Rate>,
    /// Share of withdrawn staking rewards sent to the developer pool, in percent.
    #[serde(default = "default_developer_pool_fee_pct")]
    pub developer_pool_fee_pct: u32,
    /// Share of withdrawn staking rewards sent to the insurance pool, in percent.
    #[serde(default = "default_insurance_pool_fee_pct")]
    pub insurance_pool_fee_pct: u32,
    /// Insurance pool balance above which no further fees are routed to it.
    #[serde(default = "default_insurance_pool_threshold")]
    pub insurance_pool_threshold: Amount,
    /// Blocks between two reward-processing runs.
    #[serde(default = "default_process_rewards_interval")]
    pub process_rewards_interval: u64,
}

fn default_epoch_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_unlocking_epochs() -> u32 {
    2
}

fn default_reward_rates() -> Vec<Rate> {
    vec![
        Rate::new(300_000_000, 150),
        Rate::new(200_000_000, 120),
        Rate::new(100_000_000, 110),
        Rate::new(0, 100),
    ]
}

fn default_developer_pool_fee_pct() -> u32 {
    2
}

fn default_insurance_pool_fee_pct() -> u32 {
    1
}

fn default_insurance_pool_threshold() -> Amount {
    100_000_000_000
}

fn default_process_rewards_interval() -> u64 {
    1000
}

impl Default for Params {
    fn default() -> Self {
        Self {
            epoch_duration: default_epoch_duration(),
            unlocking_epochs: default_unlocking_epochs(),
            reward_rates: default_reward_rates(),
            developer_pool_fee_pct: default_developer_pool_fee_pct(),
            insurance_pool_fee_pct: default_insurance_pool_fee_pct(),
            insurance_pool_threshold: default_insurance_pool_threshold(),
            process_rewards_interval: default_process_rewards_interval(),
        }
    }
}

impl Params {
    /// Check every field. Returns the first violation found.
    pub fn validate(&self) -> Result<(), TierError> {
        if self.epoch_duration.is_zero() {
            return Err(TierError::InvalidParams(
                "epoch_duration must be positive".to_string(),
            ));
        }
        if self.unlocking_epochs == 0 {
            return Err(TierError::InvalidParams(
                "unlocking_epochs must be positive".to_string(),
            ));
        }
        if self.reward_rates.is_empty() {
            return Err(TierError::InvalidParams(
                "reward_rates must not be empty".to_string(),
            ));
        }
        for pair in self.reward_rates.windows(2) {
            if pair[0].amount_threshold <= pair[1].amount_threshold {
                return Err(TierError::InvalidParams(format!(
                    "reward_rates must be strictly descending by threshold: {} then {}",
                    pair[0].amount_threshold, pair[1].amount_threshold
                )));
            }
        }
        if let Some(last) = self.reward_rates.last() {
            if last.amount_threshold != 0 {
                return Err(TierError::InvalidParams(format!(
                    "last reward tier must have threshold 0, got {}",
                    last.amount_threshold
                )));
            }
        }
        if let Some(rate) = self.reward_rates.iter().find(|r| r.rate_pct <= 0) {
            return Err(TierError::InvalidParams(format!(
                "reward rate for threshold {} must be positive, got {}",
                rate.amount_threshold, rate.rate_pct
            )));
        }
        if self.developer_pool_fee_pct > 100 || self.insurance_pool_fee_pct > 100 {
            return Err(TierError::InvalidParams(format!(
                "pool fees must not exceed 100%: developer {}, insurance {}",
                self.developer_pool_fee_pct, self.insurance_pool_fee_pct
            )));
        }
        if self.developer_pool_fee_pct + self.insurance_pool_fee_pct > 100 {
            return Err(TierError::InvalidParams(format!(
                "pool fees sum to {}%",
                self.developer_pool_fee_pct + self.insurance_pool_fee_pct
            )));
        }
        if self.process_rewards_interval == 0 {
            return Err(TierError::InvalidParams(
                "process_rewards_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Time between an unlock request and the release of funds.
    pub fn unlocking_period(&self) -> Result<Duration, TierError> {
        self.epoch_duration
            .checked_mul(self.unlocking_epochs)
            .ok_or_else(|| {
                TierError::Overflow(format!(
                    "{:?} x {} unlocking epochs",
                    self.epoch_duration, self.unlocking_epochs
                ))
            })
    }
}

/// Serialize a `Duration` as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
