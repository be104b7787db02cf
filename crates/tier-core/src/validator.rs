// crates/tier-core/src/validator.rs
//
// Views of staking-service state needed by the tier module: validators and
// delegations. Shares are decimals; tokens are integer amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::{AccAddress, ValAddress};
use crate::coin::{amount_to_dec, Amount};
use crate::error::TierError;

/// A validator as reported by the staking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    /// Total bonded tokens, all delegators included.
    pub tokens: Amount,
    /// Total shares issued to delegators.
    pub delegator_shares: Decimal,
    pub jailed: bool,
}

impl Validator {
    /// Convert delegation shares into the tokens they currently represent.
    ///
    /// `shares * tokens / delegator_shares`. Zero when no shares exist.
    pub fn tokens_from_shares(&self, shares: Decimal) -> Result<Decimal, TierError> {
        if self.delegator_shares.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let tokens = amount_to_dec(self.tokens)?;
        shares
            .checked_mul(tokens)
            .and_then(|v| v.checked_div(self.delegator_shares))
            .ok_or_else(|| {
                TierError::Overflow(format!(
                    "tokens_from_shares({}) on validator {}",
                    shares, self.operator
                ))
            })
    }

    /// Convert a token amount into shares at the current exchange rate.
    ///
    /// A validator without tokens issues shares 1:1.
    pub fn shares_from_tokens(&self, amount: Amount) -> Result<Decimal, TierError> {
        let amount = amount_to_dec(amount)?;
        if self.tokens == 0 || self.delegator_shares.is_zero() {
            return Ok(amount);
        }
        let tokens = amount_to_dec(self.tokens)?;
        amount
            .checked_mul(self.delegator_shares)
            .and_then(|v| v.checked_div(tokens))
            .ok_or_else(|| {
                TierError::Overflow(format!(
                    "shares_from_tokens({}) on validator {}",
                    amount, self.operator
                ))
            })
    }
}

/// A delegation held by an account with a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub shares: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn validator(tokens: Amount, shares: Decimal) -> Validator {
        Validator {
            operator: ValAddress::from_bytes([1u8; 20]),
            tokens,
            delegator_shares: shares,
            jailed: false,
        }
    }

    #[test]
    fn test_exchange_rate_one_to_one() {
        let v = validator(1000, dec!(1000));
        assert_eq!(v.tokens_from_shares(dec!(250)).unwrap(), dec!(250));
        assert_eq!(v.shares_from_tokens(250).unwrap(), dec!(250));
    }

    #[test]
    fn test_exchange_rate_after_slash() {
        // 10% of tokens burned; shares unchanged.
        let v = validator(900, dec!(1000));
        assert_eq!(v.tokens_from_shares(dec!(100)).unwrap(), dec!(90));
        assert_eq!(v.shares_from_tokens(90).unwrap(), dec!(100));
    }

    #[test]
    fn test_empty_validator() {
        let v = validator(0, Decimal::ZERO);
        assert_eq!(v.tokens_from_shares(dec!(5)).unwrap(), Decimal::ZERO);
        assert_eq!(v.shares_from_tokens(5).unwrap(), dec!(5));
    }
}
