// crates/tier-store/src/rocks.rs
//
// RocksDB-backed `KvStore` (feature `rocksdb`).
//
// Keys are the raw tier keys (see keys.rs); values are the JSON records
// written by `LockupStore`.

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};

use tier_core::TierError;

use crate::kv::{KvIter, KvStore};

/// RocksDB wrapper implementing the `KvStore` trait.
#[derive(Debug)]
pub struct RocksKvStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksKvStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, TierError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            TierError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        tracing::info!("Opened tier store at {}", path);
        Ok(Self { db })
    }
}

impl KvStore for RocksKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TierError> {
        self.db
            .get(key)
            .map_err(|e| TierError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TierError> {
        self.db
            .put(key, value)
            .map_err(|e| TierError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TierError> {
        self.db
            .delete(key)
            .map_err(|e| TierError::Storage(format!("RocksDB delete failed: {}", e)))
    }

    fn prefix_iter<'a>(&'a self, prefix: &[u8], start: Option<&[u8]>) -> KvIter<'a> {
        let prefix = prefix.to_vec();
        let from = match start {
            Some(s) if s > prefix.as_slice() => s.to_vec(),
            _ => prefix.clone(),
        };
        let iter = self
            .db
            .iterator(IteratorMode::From(&from, Direction::Forward));
        Box::new(
            iter.map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(|e| {
                    TierError::Storage(format!("RocksDB iteration error: {}", e))
                })
            })
            // Stop at the first key outside the prefix; errors pass through.
            .take_while(move |item| match item {
                Ok((k, _)) => k.starts_with(&prefix),
                Err(_) => true,
            }),
        )
    }
}
