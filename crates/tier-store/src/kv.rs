// crates/tier-store/src/kv.rs
//
// Ordered key-value store abstraction and its in-memory implementation.
//
// The tier module only needs point reads/writes and ordered prefix scans.
// Scans are lazy and restart from scratch on every call; they are not
// resumable once dropped, and callers that mutate the store while scanning
// must collect first.

use std::collections::BTreeMap;

use tier_core::TierError;

/// A raw key/value pair.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy ascending scan over raw entries.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair, TierError>> + 'a>;

/// Ordered byte-keyed store.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TierError>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TierError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), TierError>;

    /// Entries whose key starts with `prefix`, ascending by key.
    ///
    /// When `start` is given the scan begins at the first key `>= start`
    /// (still restricted to `prefix`).
    fn prefix_iter<'a>(&'a self, prefix: &[u8], start: Option<&[u8]>) -> KvIter<'a>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TierError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TierError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TierError> {
        (**self).delete(key)
    }

    fn prefix_iter<'a>(&'a self, prefix: &[u8], start: Option<&[u8]>) -> KvIter<'a> {
        (**self).prefix_iter(prefix, start)
    }
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TierError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TierError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TierError> {
        self.data.remove(key);
        Ok(())
    }

    fn prefix_iter<'a>(&'a self, prefix: &[u8], start: Option<&[u8]>) -> KvIter<'a> {
        let prefix = prefix.to_vec();
        let from = match start {
            Some(s) if s > prefix.as_slice() => s.to_vec(),
            _ => prefix.clone(),
        };
        Box::new(
            self.data
                .range(from..)
                .take_while(move |(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| Ok((k.clone(), v.clone()))),
        )
    }
}
