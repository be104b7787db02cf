// crates/tier-core/src/lib.rs
//
// tier-core: Core types, records, and collaborator traits for the tier
// lockup module.
//
// This is the leaf crate the rest of the workspace depends on. It defines
// addresses, amounts, lockup records, raw block events, the interfaces of
// the staking/bank/epoch/distribution collaborators, and the error type.

pub mod address;
pub mod coin;
pub mod context;
pub mod error;
pub mod event;
pub mod lockup;
pub mod traits;
pub mod validator;

// Re-export key types for ergonomic access from downstream crates.
pub use address::{module_address, AccAddress, ValAddress, ACCOUNT_HRP, VALIDATOR_HRP};
pub use coin::{
    amount_to_dec, checked_add, dec_to_amount_ceil, dec_to_amount_floor, parse_positive_amount,
    Amount, Coin, CREDIT_DENOM, DEFAULT_BOND_DENOM,
};
pub use context::BlockContext;
pub use error::TierError;
pub use event::BlockEvent;
pub use lockup::{InsuranceLockup, Lockup, UnlockingLockup};
pub use traits::{
    Balance, BalanceIter, BankKeeper, DistributionKeeper, EpochHooks, EpochInfo, EpochSignal,
    EpochTicker, EpochsKeeper, StakingKeeper,
};
pub use validator::{Delegation, Validator};

/// Name of the tier module account (custody of locked stake, credit minter).
pub const MODULE_NAME: &str = "tier";
/// Name of the insurance pool module account.
pub const INSURANCE_POOL_NAME: &str = "insurance_pool";
/// Name of the developer pool module account.
pub const DEVELOPER_POOL_NAME: &str = "developer_pool";
