// crates/tier-store/src/pagination.rs
//
// Key-based pagination over a prefix scan.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tier_core::TierError;

use crate::kv::KvStore;

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Page selection. `start_key` takes precedence over `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Continue from this raw store key (inclusive), as returned in `next_key`.
    pub start_key: Option<Vec<u8>>,
    /// Number of items to skip when no start key is given.
    pub offset: u64,
    /// Maximum items to return; 0 means `DEFAULT_PAGE_LIMIT`.
    pub limit: u64,
    /// Whether to count every item under the prefix.
    pub count_total: bool,
}

/// One page of decoded records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Key of the first item of the next page, if any.
    pub next_key: Option<Vec<u8>>,
    /// Total items under the prefix, when requested.
    pub total: Option<u64>,
}

/// Read one page of JSON records under `prefix`.
pub fn paginate<S, T>(store: &S, prefix: &[u8], query: &PageQuery) -> Result<Page<T>, TierError>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let limit = if query.limit == 0 {
        DEFAULT_PAGE_LIMIT
    } else {
        query.limit
    };
    let skip = if query.start_key.is_some() {
        0
    } else {
        query.offset
    };

    let mut items = Vec::new();
    let mut next_key = None;
    let iter = store
        .prefix_iter(prefix, query.start_key.as_deref())
        .skip(skip as usize);
    for entry in iter {
        let (key, value) = entry?;
        if items.len() as u64 == limit {
            next_key = Some(key);
            break;
        }
        items.push(serde_json::from_slice(&value)?);
    }

    let total = if query.count_total {
        let mut count = 0u64;
        for entry in store.prefix_iter(prefix, None) {
            entry?;
            count += 1;
        }
        Some(count)
    } else {
        None
    };

    Ok(Page {
        items,
        next_key,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;

    fn store_with(n: u32) -> MemStore {
        let mut store = MemStore::new();
        for i in 0..n {
            let mut key = b"p".to_vec();
            key.extend_from_slice(&i.to_be_bytes());
            store.set(&key, &serde_json::to_vec(&i).unwrap()).unwrap();
        }
        store.set(b"q", b"99").unwrap();
        store
    }

    #[test]
    fn test_first_page_and_continuation() {
        let store = store_with(5);
        let query = PageQuery {
            limit: 2,
            count_total: true,
            ..Default::default()
        };
        let page: Page<u32> = paginate(&store, b"p", &query).unwrap();
        assert_eq!(page.items, vec![0, 1]);
        assert_eq!(page.total, Some(5));

        let query = PageQuery {
            start_key: page.next_key,
            limit: 2,
            ..Default::default()
        };
        let page: Page<u32> = paginate(&store, b"p", &query).unwrap();
        assert_eq!(page.items, vec![2, 3]);
        assert!(page.next_key.is_some());
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_offset_and_last_page() {
        let store = store_with(5);
        let query = PageQuery {
            offset: 3,
            limit: 10,
            ..Default::default()
        };
        let page: Page<u32> = paginate(&store, b"p", &query).unwrap();
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.next_key, None);
    }

    #[test]
    fn test_default_limit() {
        let store = store_with(3);
        let page: Page<u32> = paginate(&store, b"p", &PageQuery::default()).unwrap();
        assert_eq!(page.items.len(), 3);
    }
}
