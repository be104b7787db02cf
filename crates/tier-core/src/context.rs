// crates/tier-core/src/context.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header data of the block currently being executed.
///
/// Every operation that reads the clock or records a creation height takes
/// this explicitly; there is no ambient "current block".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block height.
    pub height: i64,
    /// Block time (from the block header, identical on every node).
    pub time: DateTime<Utc>,
}

impl BlockContext {
    pub fn new(height: i64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }
}
