// crates/tier-economics/src/metrics.rs
//
// Operational counters of the tier module.
//
// Counters are plain atomics so the keeper can bump them through a shared
// `Arc` without locking; `snapshot()` copies them into a serializable struct
// for logs and the node's status output.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use tier_core::Amount;

/// Tier module metrics collector.
#[derive(Debug, Default)]
pub struct TierMetrics {
    pub locks: AtomicU64,
    pub unlocks: AtomicU64,
    pub redelegations: AtomicU64,
    pub cancellations: AtomicU64,
    pub unlockings_completed: AtomicU64,
    /// Total credit minted (base units, saturating at u64::MAX).
    pub credits_minted: AtomicU64,
    /// Total credit burned (base units, saturating at u64::MAX).
    pub credits_burned: AtomicU64,
    pub slash_events_processed: AtomicU64,
    pub slash_events_skipped: AtomicU64,
    /// Swallowed errors from the slashing adapter and reward processing.
    pub internal_errors: AtomicU64,
    pub rewards_processed: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub locks: u64,
    pub unlocks: u64,
    pub redelegations: u64,
    pub cancellations: u64,
    pub unlockings_completed: u64,
    pub credits_minted: u64,
    pub credits_burned: u64,
    pub slash_events_processed: u64,
    pub slash_events_skipped: u64,
    pub internal_errors: u64,
    pub rewards_processed: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn add_amount(counter: &AtomicU64, amount: Amount) {
    let amount = u64::try_from(amount).unwrap_or(u64::MAX);
    // fetch_update never fails when the closure always returns Some.
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_add(amount))
    });
}

impl TierMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lock(&self) {
        bump(&self.locks);
    }

    pub fn record_unlock(&self) {
        bump(&self.unlocks);
    }

    pub fn record_redelegation(&self) {
        bump(&self.redelegations);
    }

    pub fn record_cancellation(&self) {
        bump(&self.cancellations);
    }

    pub fn record_unlockings_completed(&self, count: u64) {
        self.unlockings_completed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_credits_minted(&self, amount: Amount) {
        add_amount(&self.credits_minted, amount);
    }

    pub fn record_credits_burned(&self, amount: Amount) {
        add_amount(&self.credits_burned, amount);
    }

    pub fn record_slash_processed(&self) {
        bump(&self.slash_events_processed);
    }

    pub fn record_slash_skipped(&self) {
        bump(&self.slash_events_skipped);
    }

    pub fn record_internal_error(&self) {
        bump(&self.internal_errors);
    }

    pub fn record_rewards_processed(&self) {
        bump(&self.rewards_processed);
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            locks: load(&self.locks),
            unlocks: load(&self.unlocks),
            redelegations: load(&self.redelegations),
            cancellations: load(&self.cancellations),
            unlockings_completed: load(&self.unlockings_completed),
            credits_minted: load(&self.credits_minted),
            credits_burned: load(&self.credits_burned),
            slash_events_processed: load(&self.slash_events_processed),
            slash_events_skipped: load(&self.slash_events_skipped),
            internal_errors: load(&self.internal_errors),
            rewards_processed: load(&self.rewards_processed),
        }
    }
}
