// crates/tier-rpc/src/handlers/mod.rs
//
// Handler modules for the tier module's produced interfaces.
// Each module defines request/response types and handler functions for one
// API group.

pub mod msg;
pub mod params;
pub mod query;

use tier_core::{AccAddress, TierError, ValAddress};

use crate::error::RpcError;

pub(crate) fn parse_account(field: &str, value: &str) -> Result<AccAddress, RpcError> {
    AccAddress::from_bech32(value).map_err(|e| with_field(field, e))
}

pub(crate) fn parse_validator(field: &str, value: &str) -> Result<ValAddress, RpcError> {
    ValAddress::from_bech32(value).map_err(|e| with_field(field, e))
}

fn with_field(field: &str, err: TierError) -> RpcError {
    let mut rpc = RpcError::from(err);
    rpc.message = format!("{}: {}", field, rpc.message);
    rpc
}
