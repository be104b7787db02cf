// crates/tier-rpc/src/handlers/params.rs
//
// Governance handler: UpdateParams.

use serde::{Deserialize, Serialize};

use tier_economics::{Keeper, Params};
use tier_store::KvStore;

use super::parse_account;
use crate::error::RpcError;

/// Replace the full params set. Only the configured authority may submit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: String,
    pub params: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParamsResponse {}

pub fn handle_update_params<S: KvStore>(
    keeper: &mut Keeper<S>,
    msg: MsgUpdateParams,
) -> Result<MsgUpdateParamsResponse, RpcError> {
    let authority = parse_account("authority", &msg.authority)?;
    keeper.update_params(&authority, &msg.params)?;
    Ok(MsgUpdateParamsResponse {})
}
