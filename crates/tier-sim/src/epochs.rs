// crates/tier-sim/src/epochs.rs
//
// `SimEpochs`: fixed-duration epoch clocks driven by block time.
//
// Each identifier starts at epoch 0 and begins epoch 1 at the first block
// at or after its start time. From then on, a block whose time has reached
// `current_epoch_start_time + duration` ends the current epoch and starts the
// next one; at most one boundary is crossed per identifier per block.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use tier_core::{BlockContext, EpochInfo, EpochSignal, EpochTicker, EpochsKeeper, TierError};

#[derive(Debug, Clone)]
struct EpochClock {
    info: EpochInfo,
    started: bool,
}

#[derive(Debug, Default)]
pub struct SimEpochs {
    clocks: RwLock<BTreeMap<String, EpochClock>>,
}

impl SimEpochs {
    /// One epoch clock starting at `start`.
    pub fn new(identifier: &str, duration: Duration, start: DateTime<Utc>) -> Self {
        let epochs = Self::default();
        epochs.add_epoch(identifier, duration, start);
        epochs
    }

    /// Register another identifier. Replaces an existing clock of that name.
    pub fn add_epoch(&self, identifier: &str, duration: Duration, start: DateTime<Utc>) {
        self.clocks.write().insert(
            identifier.to_string(),
            EpochClock {
                info: EpochInfo {
                    identifier: identifier.to_string(),
                    current_epoch: 0,
                    current_epoch_start_time: start,
                    duration,
                },
                started: false,
            },
        );
    }
}

impl EpochsKeeper for SimEpochs {
    fn get_epoch_info(&self, identifier: &str) -> Result<EpochInfo, TierError> {
        self.clocks
            .read()
            .get(identifier)
            .map(|clock| clock.info.clone())
            .ok_or_else(|| TierError::Epoch(format!("unknown epoch identifier '{}'", identifier)))
    }
}

impl EpochTicker for SimEpochs {
    fn tick(&self, ctx: &BlockContext) -> Vec<EpochSignal> {
        let mut signals = Vec::new();
        let mut clocks = self.clocks.write();
        for clock in clocks.values_mut() {
            let info = &mut clock.info;
            if !clock.started {
                if ctx.time >= info.current_epoch_start_time {
                    clock.started = true;
                    info.current_epoch = 1;
                    signals.push(EpochSignal::BeforeEpochStart {
                        identifier: info.identifier.clone(),
                        epoch_number: 1,
                    });
                }
                continue;
            }
            let Ok(duration) = chrono::Duration::from_std(info.duration) else {
                continue;
            };
            if info.duration.is_zero() {
                continue;
            }
            let end = info.current_epoch_start_time + duration;
            if ctx.time < end {
                continue;
            }
            signals.push(EpochSignal::AfterEpochEnd {
                identifier: info.identifier.clone(),
                epoch_number: info.current_epoch,
            });
            info.current_epoch += 1;
            info.current_epoch_start_time = end;
            signals.push(EpochSignal::BeforeEpochStart {
                identifier: info.identifier.clone(),
                epoch_number: info.current_epoch,
            });
            debug!(
                "Epoch '{}' advanced to {} at height {}",
                info.identifier, info.current_epoch, ctx.height
            );
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn ctx(height: i64, secs: i64) -> BlockContext {
        BlockContext::new(height, start() + chrono::Duration::seconds(secs))
    }

    #[test]
    fn test_first_block_starts_epoch_one() {
        let epochs = SimEpochs::new("tier", Duration::from_secs(60), start());
        let signals = epochs.tick(&ctx(1, 0));
        assert_eq!(
            signals,
            vec![EpochSignal::BeforeEpochStart {
                identifier: "tier".to_string(),
                epoch_number: 1
            }]
        );
        assert!(epochs.tick(&ctx(2, 30)).is_empty());
    }

    #[test]
    fn test_boundary_emits_end_then_start() {
        let epochs = SimEpochs::new("tier", Duration::from_secs(60), start());
        epochs.tick(&ctx(1, 0));
        let signals = epochs.tick(&ctx(2, 61));
        assert_eq!(signals.len(), 2);
        assert!(matches!(
            signals[0],
            EpochSignal::AfterEpochEnd { epoch_number: 1, .. }
        ));
        assert!(matches!(
            signals[1],
            EpochSignal::BeforeEpochStart { epoch_number: 2, .. }
        ));

        let info = epochs.get_epoch_info("tier").unwrap();
        assert_eq!(info.current_epoch, 2);
        // Epoch start stays on the fixed grid, not the block time.
        assert_eq!(info.current_epoch_start_time, ctx(0, 60).time);
    }

    #[test]
    fn test_unknown_identifier() {
        let epochs = SimEpochs::new("tier", Duration::from_secs(60), start());
        assert_eq!(
            epochs.get_epoch_info("day").unwrap_err().code(),
            "epoch"
        );
    }

    #[test]
    fn test_multiple_identifiers_tick_independently() {
        let epochs = SimEpochs::new("tier", Duration::from_secs(60), start());
        epochs.add_epoch("day", Duration::from_secs(86_400), start());
        assert_eq!(epochs.tick(&ctx(1, 0)).len(), 2);
        assert_eq!(epochs.tick(&ctx(2, 60)).len(), 2);
        assert_eq!(epochs.get_epoch_info("day").unwrap().current_epoch, 1);
    }
}
