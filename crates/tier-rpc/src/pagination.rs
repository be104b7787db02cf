// crates/tier-rpc/src/pagination.rs
//
// Wire form of store pagination. Continuation keys are hex-encoded raw
// store keys.

use serde::{Deserialize, Serialize};

use tier_store::{Page, PageQuery};

use crate::error::RpcError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    /// Hex `next_key` from a previous response. Takes precedence over `offset`.
    pub key: Option<String>,
    pub offset: u64,
    /// 0 selects the default limit.
    pub limit: u64,
    pub count_total: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Hex key to continue from, absent on the last page.
    pub next_key: Option<String>,
    /// Total matching records, when requested.
    pub total: Option<u64>,
}

impl PageRequest {
    pub fn to_query(&self) -> Result<PageQuery, RpcError> {
        let start_key = match &self.key {
            Some(key) if !key.is_empty() => Some(
                hex::decode(key)
                    .map_err(|e| RpcError::bad_request(format!("invalid page key '{}': {}", key, e)))?,
            ),
            _ => None,
        };
        Ok(PageQuery {
            start_key,
            offset: self.offset,
            limit: self.limit,
            count_total: self.count_total,
        })
    }
}

impl PageResponse {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            next_key: page.next_key.as_ref().map(hex::encode),
            total: page.total,
        }
    }
}
