// crates/tier-core/src/coin.rs
//
// Token amounts, coins, and decimal conversion helpers.
//
// All quantities are tracked as non-negative integers in the smallest unit of
// their denomination. Fractions (rates, shares) use `rust_decimal::Decimal`
// and are converted back to integers by truncation, never by rounding.

use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TierError;

/// Quantity of a token in its smallest unit.
pub type Amount = u128;

/// Default staking denomination.
pub const DEFAULT_BOND_DENOM: &str = "uopen";

/// Denomination of the credit reward token.
pub const CREDIT_DENOM: &str = "ucredit";

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parse a user-supplied amount string, rejecting anything that is not a
/// strictly positive integer.
pub fn parse_positive_amount(s: &str) -> Result<Amount, TierError> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(TierError::InvalidAmount(format!(
            "amount '{}' must be positive",
            s
        )));
    }
    let amount: Amount = trimmed
        .parse()
        .map_err(|_| TierError::InvalidAmount(format!("amount '{}' is not an integer", s)))?;
    if amount == 0 {
        return Err(TierError::InvalidAmount(format!(
            "amount '{}' must be positive",
            s
        )));
    }
    Ok(amount)
}

/// Lift an integer amount into decimal space.
pub fn amount_to_dec(amount: Amount) -> Result<Decimal, TierError> {
    Decimal::from_u128(amount).ok_or_else(|| {
        TierError::Overflow(format!("amount {} exceeds decimal precision", amount))
    })
}

/// Truncate a decimal toward zero and return it as an amount.
///
/// Negative inputs are rejected; they indicate an accounting bug upstream.
pub fn dec_to_amount_floor(value: Decimal) -> Result<Amount, TierError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(TierError::InvalidAmount(format!(
            "decimal {} is negative",
            value
        )));
    }
    value
        .floor()
        .to_u128()
        .ok_or_else(|| TierError::Overflow(format!("decimal {} does not fit an amount", value)))
}

/// Round a decimal up to the next integer and return it as an amount.
pub fn dec_to_amount_ceil(value: Decimal) -> Result<Amount, TierError> {
    dec_to_amount_floor(value.ceil())
}

/// Checked addition with a descriptive overflow error.
pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, TierError> {
    a.checked_add(b)
        .ok_or_else(|| TierError::Overflow(format!("{} + {}", a, b)))
}
