// crates/tier-core/src/error.rs

use thiserror::Error;

/// Module-wide error type for the tier lockup module.
///
/// Collaborator failures (bank, staking, epochs) are wrapped into their own
/// variants so callers can still tell them apart from lockup-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    /// Non-positive or over-limit quantity.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed delegator or validator identifier.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The targeted lockup or unlocking lockup does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parameter update submitted by someone other than the authority.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Params failed validation.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Structurally valid request that cannot be executed (e.g. same src/dst validator).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Account does not hold enough spendable funds.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Staking service has no such validator.
    #[error("Validator not found: {0}")]
    ValidatorNotFound(String),

    /// Other staking service failure.
    #[error("Staking error: {0}")]
    Staking(String),

    /// Other bank service failure.
    #[error("Bank error: {0}")]
    Bank(String),

    /// Epoch service failure (unknown identifier, etc.).
    #[error("Epoch error: {0}")]
    Epoch(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Checked arithmetic overflowed.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// A block event could not be parsed.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}

impl TierError {
    /// Stable machine-readable kind, surfaced to transaction submitters.
    pub fn code(&self) -> &'static str {
        match self {
            TierError::InvalidAmount(_) => "invalid_amount",
            TierError::InvalidAddress(_) => "invalid_address",
            TierError::NotFound(_) => "not_found",
            TierError::Unauthorized(_) => "unauthorized",
            TierError::InvalidParams(_) => "invalid_params",
            TierError::InvalidRequest(_) => "invalid_request",
            TierError::InsufficientFunds(_) => "insufficient_funds",
            TierError::ValidatorNotFound(_) => "validator_not_found",
            TierError::Staking(_) => "staking",
            TierError::Bank(_) => "bank",
            TierError::Epoch(_) => "epoch",
            TierError::Storage(_) => "storage",
            TierError::Serialization(_) => "serialization",
            TierError::Overflow(_) => "overflow",
            TierError::MalformedEvent(_) => "malformed_event",
        }
    }
}

impl From<serde_json::Error> for TierError {
    fn from(e: serde_json::Error) -> Self {
        TierError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_kind() {
        assert_eq!(TierError::InvalidAmount("x".into()).code(), "invalid_amount");
        assert_eq!(TierError::NotFound("x".into()).code(), "not_found");
        assert_eq!(TierError::Unauthorized("x".into()).code(), "unauthorized");
    }

    #[test]
    fn test_message_includes_detail() {
        let err = TierError::InvalidAmount("amount 0 must be positive".into());
        assert_eq!(err.to_string(), "Invalid amount: amount 0 must be positive");
    }

    #[test]
    fn test_from_serde_json() {
        let err: TierError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.code(), "serialization");
    }
}
