// crates/tier-economics/src/events.rs
//
// Domain events emitted by the tier module for observability.
//
// The keeper buffers events while a block executes; the host drains and
// logs them at the end of each block. No core logic consumes them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tier_core::{AccAddress, Amount, ValAddress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TierEvent {
    Lock {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Amount,
        credit_minted: Amount,
    },
    Unlock {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Amount,
        creation_height: i64,
        completion_time: DateTime<Utc>,
        unlock_time: DateTime<Utc>,
    },
    Redelegate {
        delegator: AccAddress,
        src_validator: ValAddress,
        dst_validator: ValAddress,
        amount: Amount,
        completion_time: DateTime<Utc>,
    },
    CancelUnlocking {
        delegator: AccAddress,
        validator: ValAddress,
        creation_height: i64,
        amount: Amount,
    },
    CompleteUnlocking {
        delegator: AccAddress,
        validator: ValAddress,
        creation_height: i64,
        amount: Amount,
    },
    SlashRedistributed {
        validator: ValAddress,
        reason: String,
        module_share: String,
        covered: Amount,
        lockups_adjusted: u64,
    },
}

impl TierEvent {
    /// Short event name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            TierEvent::Lock { .. } => "lock",
            TierEvent::Unlock { .. } => "unlock",
            TierEvent::Redelegate { .. } => "redelegate",
            TierEvent::CancelUnlocking { .. } => "cancel_unlocking",
            TierEvent::CompleteUnlocking { .. } => "complete_unlocking",
            TierEvent::SlashRedistributed { .. } => "slash_redistributed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_with_type_tag() {
        let event = TierEvent::Lock {
            delegator: AccAddress::from_bytes([1u8; 20]),
            validator: ValAddress::from_bytes([2u8; 20]),
            amount: 10,
            credit_minted: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "lock");
        assert_eq!(event.name(), "lock");
    }
}
