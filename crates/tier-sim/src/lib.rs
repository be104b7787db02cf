// crates/tier-sim/src/lib.rs
//
// tier-sim: In-memory collaborators for the tier lockup module.
//
// `SimChain` is a small deterministic ledger implementing the staking, bank
// and distribution interfaces over one shared state. `SimEpochs` tracks
// epoch clocks and emits boundary signals as blocks advance. Both are used by
// the test suites and by the node's devnet simulation.

pub mod chain;
pub mod epochs;

// Re-export key types for ergonomic access from downstream crates.
pub use chain::{SimChain, UnbondingEntry};
pub use epochs::SimEpochs;
