// crates/tier-node/src/runner.rs
//
// Block production loops: back to back, or paced on a tokio timer.

use std::time::Duration;

use tier_store::KvStore;

use crate::devnet::TxGenerator;
use crate::host::{BlockHost, BlockReport, HostError};

/// Generate and execute one block.
pub fn step<S: KvStore>(
    host: &mut BlockHost<S>,
    generator: &mut TxGenerator,
) -> Result<BlockReport, HostError> {
    let input = generator.next_block(host);
    let report = host.execute_block(input)?;
    if !report.epoch_signals.is_empty() {
        tracing::info!(
            "Block {} crossed {} epoch boundaries",
            report.height,
            report.epoch_signals.len()
        );
    }
    tracing::debug!(
        "Block {}: {}/{} txs accepted, {} slashes processed, {} failed",
        report.height,
        report.accepted_txs(),
        report.txs.len(),
        report.slashing.processed,
        report.slashing.failed
    );
    Ok(report)
}

/// Run `blocks` blocks without pacing. Returns the number executed.
pub fn run_blocks<S: KvStore>(
    host: &mut BlockHost<S>,
    generator: &mut TxGenerator,
    blocks: u64,
) -> Result<u64, HostError> {
    for _ in 0..blocks {
        step(host, generator)?;
    }
    Ok(blocks)
}

/// Produce one block per `block_time` until Ctrl-C or `limit` blocks.
/// Returns the number executed.
pub async fn run_paced<S: KvStore>(
    host: &mut BlockHost<S>,
    generator: &mut TxGenerator,
    block_time: Duration,
    limit: Option<u64>,
) -> Result<u64, HostError> {
    let mut interval = tokio::time::interval(block_time);
    // The first tick completes immediately.
    interval.tick().await;
    let limit = limit.unwrap_or(u64::MAX);
    let mut produced = 0u64;

    while produced < limit {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                step(host, generator)?;
                produced += 1;
            }
        }
    }
    Ok(produced)
}
