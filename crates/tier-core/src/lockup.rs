// crates/tier-core/src/lockup.rs
//
// Lockup records owned by the tier module.
//
//   Lockup          (delegator, validator)                  -> active stake
//   UnlockingLockup (delegator, validator, creation_height) -> stake on its way out
//   InsuranceLockup (delegator, validator)                  -> insurance-backed share

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{AccAddress, ValAddress};
use crate::coin::Amount;

/// Stake actively routed through the module to a validator.
///
/// Unique per (delegator, validator). A record with zero amount is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockup {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub amount: Amount,
}

/// Stake that left a lockup but has not yet been returned to the delegator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockingLockup {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    /// Height of the block in which the unlock was requested.
    pub creation_height: i64,
    pub amount: Amount,
    /// When the staking service finishes unbonding.
    pub completion_time: DateTime<Utc>,
    /// Module-level unlock deadline.
    pub unlock_time: DateTime<Utc>,
}

impl UnlockingLockup {
    /// Whether the module-level unlock deadline has been reached at `now`.
    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_time
    }

    /// Earliest time the funds can leave the module: custody only holds them
    /// once staking has finished unbonding.
    pub fn release_time(&self) -> DateTime<Utc> {
        self.unlock_time.max(self.completion_time)
    }

    /// Whether both the unlock deadline and the unbonding completion have
    /// passed at `now`.
    pub fn is_releasable(&self, now: DateTime<Utc>) -> bool {
        now >= self.release_time()
    }
}

/// Portion of a delegator's lockup restored by insurance-pool delegation
/// after a downtime slash. Only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceLockup {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unlocked_at_and_after_deadline() {
        let unlock_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let record = UnlockingLockup {
            delegator: AccAddress::from_bytes([1u8; 20]),
            validator: ValAddress::from_bytes([2u8; 20]),
            creation_height: 10,
            amount: 100,
            completion_time: unlock_time - chrono::Duration::hours(1),
            unlock_time,
        };
        assert!(!record.is_unlocked(unlock_time - chrono::Duration::seconds(1)));
        assert!(record.is_unlocked(unlock_time));
        assert!(record.is_unlocked(unlock_time + chrono::Duration::days(3)));
        assert!(record.is_releasable(unlock_time));
    }

    #[test]
    fn test_release_waits_for_unbonding_completion() {
        let unlock_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let completion_time = unlock_time + chrono::Duration::minutes(30);
        let record = UnlockingLockup {
            delegator: AccAddress::from_bytes([1u8; 20]),
            validator: ValAddress::from_bytes([2u8; 20]),
            creation_height: 10,
            amount: 100,
            completion_time,
            unlock_time,
        };
        assert!(record.is_unlocked(unlock_time));
        assert!(!record.is_releasable(unlock_time));
        assert!(!record.is_releasable(completion_time - chrono::Duration::seconds(1)));
        assert_eq!(record.release_time(), completion_time);
        assert!(record.is_releasable(completion_time));
    }
}
