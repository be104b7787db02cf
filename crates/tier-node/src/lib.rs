// crates/tier-node/src/lib.rs
//
// tier-node: host integration for the tier lockup module.
//
// Wires the keeper to simulated staking, bank, epoch and distribution
// collaborators, drives it block by block, and generates a reproducible
// devnet workload. The `tier-node` binary is a thin CLI over this library.

pub mod config;
pub mod devnet;
pub mod host;
pub mod runner;

use tier_store::{KvStore, MemStore};

// Re-export key types for ergonomic access from the binary and tests.
pub use config::{NodeConfig, ParamsOverride, RateOverride};
pub use devnet::{genesis, governance_address, Devnet, TxGenerator};
pub use host::{BlockHost, BlockInput, BlockReport, HostError, SlashOrder, TxOutcome};
pub use runner::{run_blocks, run_paced, step};

/// Open the store backend named in the config.
pub fn open_store(config: &NodeConfig) -> Result<Box<dyn KvStore>, HostError> {
    match config.store.as_str() {
        "memory" => Ok(Box::new(MemStore::new())),
        "rocksdb" => open_rocks(config),
        other => Err(HostError::Config(format!(
            "unknown store '{}', expected 'memory' or 'rocksdb'",
            other
        ))),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocks(config: &NodeConfig) -> Result<Box<dyn KvStore>, HostError> {
    let path = format!("{}/tier", config.data_dir);
    Ok(Box::new(tier_store::RocksKvStore::open(&path)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocks(_config: &NodeConfig) -> Result<Box<dyn KvStore>, HostError> {
    Err(HostError::Config(
        "built without the 'rocksdb' feature".to_string(),
    ))
}
