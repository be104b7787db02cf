// crates/tier-rpc/src/router.rs
//
// JSON request envelope and method dispatch for the tier module.
//
// A submitter sends a method name and a JSON params payload. Transactions
// run against the keeper in the current block context; queries only read.
// Every failure becomes an error response, never a panic.

use serde::{Deserialize, Serialize};

use tier_core::BlockContext;
use tier_economics::Keeper;
use tier_store::KvStore;

use crate::error::RpcError;
use crate::handlers;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC-style request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The method to invoke (e.g., "tier/lock", "tier/query/lockups").
    pub method: String,
    /// JSON-encoded parameters for the method.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<serde_json::Value>,
    /// Error kind and message (if not success).
    pub error: Option<RpcError>,
}

/// Methods that change state. Everything else under `tier/query/` is read-only.
pub const TX_METHODS: &[&str] = &[
    "tier/lock",
    "tier/unlock",
    "tier/redelegate",
    "tier/cancel_unlocking",
    "tier/update_params",
];

pub fn is_tx_method(method: &str) -> bool {
    TX_METHODS.contains(&method)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Route a request to its handler and wrap the outcome in a response.
pub fn dispatch<S: KvStore>(
    keeper: &mut Keeper<S>,
    ctx: &BlockContext,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let params = request.params;
    let result = match request.method.as_str() {
        // Transactions
        "tier/lock" => dispatch_handler(params, |r| handlers::msg::handle_lock(keeper, ctx, r)),
        "tier/unlock" => {
            dispatch_handler(params, |r| handlers::msg::handle_unlock(keeper, ctx, r))
        }
        "tier/redelegate" => {
            dispatch_handler(params, |r| handlers::msg::handle_redelegate(keeper, ctx, r))
        }
        "tier/cancel_unlocking" => dispatch_handler(params, |r| {
            handlers::msg::handle_cancel_unlocking(keeper, ctx, r)
        }),
        "tier/update_params" => {
            dispatch_handler(params, |r| handlers::params::handle_update_params(keeper, r))
        }

        // Queries
        "tier/query/params" => {
            dispatch_handler(params, |r| handlers::query::handle_params(keeper, r))
        }
        "tier/query/lockup" => {
            dispatch_handler(params, |r| handlers::query::handle_lockup(keeper, r))
        }
        "tier/query/lockups" => {
            dispatch_handler(params, |r| handlers::query::handle_lockups(keeper, r))
        }
        "tier/query/unlocking_lockup" => dispatch_handler(params, |r| {
            handlers::query::handle_unlocking_lockup(keeper, r)
        }),
        "tier/query/unlocking_lockups" => dispatch_handler(params, |r| {
            handlers::query::handle_unlocking_lockups(keeper, r)
        }),
        "tier/query/insurance_lockup" => dispatch_handler(params, |r| {
            handlers::query::handle_insurance_lockup(keeper, r)
        }),

        other => Err(RpcError::new(
            "unknown_method",
            format!("Unknown method: {}", other),
        )),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            success: true,
            result: Some(value),
            error: None,
        },
        Err(err) => {
            tracing::debug!(method = %request.method, code = %err.code, "request failed: {}", err.message);
            JsonRpcResponse {
                success: false,
                result: None,
                error: Some(err),
            }
        }
    }
}

/// Decode params, run the handler, encode the response.
fn dispatch_handler<Req, Resp, F>(
    params: serde_json::Value,
    handler: F,
) -> Result<serde_json::Value, RpcError>
where
    Req: serde::de::DeserializeOwned,
    Resp: Serialize,
    F: FnOnce(Req) -> Result<Resp, RpcError>,
{
    // A missing payload is treated as an empty object so parameterless
    // queries can omit it.
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    let request: Req = serde_json::from_value(params)
        .map_err(|e| RpcError::bad_request(format!("Failed to deserialize request: {}", e)))?;
    let response = handler(request)?;
    serde_json::to_value(response)
        .map_err(|e| RpcError::new("internal", format!("Failed to serialize response: {}", e)))
}
