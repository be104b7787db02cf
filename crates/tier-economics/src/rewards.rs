// crates/tier-economics/src/rewards.rs
//
// Credit reward engine.
//
// New stake is rewarded band by band, highest tier first: the part of the
// delegator's post-lock total that lies above a tier's threshold (and above
// the principal already locked) earns that tier's rate. Previously locked
// principal is never rewarded again. Each band's contribution is truncated
// toward zero before being summed.
//
// Within an epoch the result is prorated by the fraction of the epoch that
// has already elapsed, so a lock late in the epoch earns proportionally less
// until the next epoch reset re-mints credit at the full rate.

use std::time::Duration;

use chrono::{DateTime, Utc};

use tier_core::{amount_to_dec, checked_add, dec_to_amount_floor, Amount, TierError};

use crate::params::Rate;

/// Credit earned by adding `incoming` on top of `locked`.
///
/// `rates` is expected highest-threshold first; it is re-sorted here so an
/// unsorted table still yields the tiered result. Returns 0 when `incoming`
/// is 0.
pub fn calculate_credit(rates: &[Rate], locked: Amount, incoming: Amount) -> Result<Amount, TierError> {
    if incoming == 0 {
        return Ok(0);
    }

    let mut tiers = rates.to_vec();
    tiers.sort_by(|a, b| b.amount_threshold.cmp(&a.amount_threshold));

    let mut total = checked_add(locked, incoming)?;
    let mut remaining = incoming;
    let mut credit: Amount = 0;

    for tier in &tiers {
        if total < tier.amount_threshold {
            continue;
        }
        let lower = tier.amount_threshold.max(locked);
        let band = total - lower;
        let contribution = amount_to_dec(band)?
            .checked_mul(tier.multiplier())
            .ok_or_else(|| {
                TierError::Overflow(format!("{} x {}% credit band", band, tier.rate_pct))
            })?;
        credit = checked_add(credit, dec_to_amount_floor(contribution)?)?;

        total -= band;
        remaining = remaining.saturating_sub(band);
        if remaining == 0 {
            break;
        }
    }

    Ok(credit)
}

/// `calculate_credit` scaled by the elapsed fraction of the current epoch.
///
/// Elapsed time is measured in milliseconds and clamped to
/// `[0, epoch_duration]`. A zero-length epoch yields 0.
pub fn calculate_prorated_credit(
    rates: &[Rate],
    locked: Amount,
    incoming: Amount,
    epoch_start: DateTime<Utc>,
    now: DateTime<Utc>,
    epoch_duration: Duration,
) -> Result<Amount, TierError> {
    let duration_ms = epoch_duration.as_millis();
    if duration_ms == 0 {
        return Ok(0);
    }

    let credit = calculate_credit(rates, locked, incoming)?;
    let elapsed_ms = (now - epoch_start).num_milliseconds().max(0) as u128;
    let elapsed_ms = elapsed_ms.min(duration_ms);

    let scaled = credit.checked_mul(elapsed_ms).ok_or_else(|| {
        TierError::Overflow(format!("prorating credit {} over {} ms", credit, elapsed_ms))
    })?;
    Ok(scaled / duration_ms)
}
