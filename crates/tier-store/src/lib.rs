// crates/tier-store/src/lib.rs
//
// tier-store: Storage layer for the tier lockup module.
//
// Provides the ordered key-value abstraction, an in-memory backend, an
// optional RocksDB backend, the key layout, pagination, and the typed
// `LockupStore` that owns every tier record.

pub mod keys;
pub mod kv;
pub mod lockups;
pub mod pagination;
#[cfg(feature = "rocksdb")]
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use kv::{KvIter, KvPair, KvStore, MemStore};
pub use lockups::{LockupStore, RecordIter};
pub use pagination::{paginate, Page, PageQuery, DEFAULT_PAGE_LIMIT};
#[cfg(feature = "rocksdb")]
pub use rocks::RocksKvStore;
