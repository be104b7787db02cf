// crates/tier-core/src/event.rs
//
// Raw block events as delivered by the runtime (type + string attributes).
// The slashing adapter consumes the `slash` events emitted by the slashing
// and evidence subsystems.

use serde::{Deserialize, Serialize};

/// Event type emitted when a validator is slashed.
pub const EVENT_TYPE_SLASH: &str = "slash";
/// Validator operator address attribute.
pub const ATTRIBUTE_ADDRESS: &str = "address";
/// Slash cause attribute.
pub const ATTRIBUTE_REASON: &str = "reason";
/// Burned token amount attribute.
pub const ATTRIBUTE_BURNED_COINS: &str = "burned_coins";

pub const REASON_DOUBLE_SIGN: &str = "double_sign";
pub const REASON_MISSING_SIGNATURE: &str = "missing_signature";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// A typed event with ordered key/value attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvent {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl BlockEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// First value for `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    pub fn is_slash(&self) -> bool {
        self.kind == EVENT_TYPE_SLASH
    }
}
