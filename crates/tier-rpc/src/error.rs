// crates/tier-rpc/src/error.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tier_core::TierError;

/// Error returned to a request submitter.
///
/// `code` is the stable kind from `TierError::code()`, or `bad_request` /
/// `unknown_method` for envelope-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

impl RpcError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<TierError> for RpcError {
    fn from(err: TierError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
