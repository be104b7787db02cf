// crates/tier-economics/src/lib.rs
//
// tier-economics: Accounting logic of the tier lockup module.
//
// Stake locked through the module earns credit, a secondary token whose rate
// is tiered by the delegator's total locked amount and prorated within the
// current epoch. Credit is burned and re-minted at every epoch start. Slashes
// against validators the module delegates to are spread across lockups, with
// downtime slashes covered by the insurance pool.
//
// All amounts are base units of their denomination (u128); rates and shares
// are `rust_decimal::Decimal`.

pub mod epoch;
pub mod events;
pub mod keeper;
pub mod lifecycle;
pub mod metrics;
pub mod params;
pub mod pools;
pub mod rewards;
pub mod slashing;

// Re-export key types for ergonomic access from downstream crates.
pub use events::TierEvent;
pub use keeper::{Collaborators, Keeper, TierConfig};
pub use lifecycle::{LockReceipt, UnlockReceipt};
pub use metrics::{MetricsSnapshot, TierMetrics};
pub use params::{Params, Rate};
pub use pools::RewardSplit;
pub use rewards::{calculate_credit, calculate_prorated_credit};
pub use slashing::{SlashEvent, SlashOutcome, SlashReason, SlashReport};
