// crates/tier-rpc/src/lib.rs
//
// tier-rpc: Request/response handlers for the tier lockup module.
//
// Handlers take serde request structs with bech32 addresses and decimal
// string amounts, validate them, call the keeper, and return typed
// responses. `router::dispatch` accepts a JSON envelope with a method name
// and routes it to the matching handler.

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod router;

// Re-export key types for ergonomic access from downstream crates.
pub use error::RpcError;
pub use pagination::{PageRequest, PageResponse};
pub use router::{dispatch, JsonRpcRequest, JsonRpcResponse};
