// crates/tier-rpc/src/handlers/msg.rs
//
// Transaction handlers: Lock, Unlock, Redelegate, CancelUnlocking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tier_core::{parse_positive_amount, BlockContext};
use tier_economics::Keeper;
use tier_store::KvStore;

use super::{parse_account, parse_validator};
use crate::error::RpcError;

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgLock {
    pub delegator_address: String,
    pub validator_address: String,
    /// Base units of the bond denom, as a decimal string.
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgLockResponse {
    /// Lockup amount after the lock.
    pub locked: String,
    pub credit_minted: String,
}

pub fn handle_lock<S: KvStore>(
    keeper: &mut Keeper<S>,
    ctx: &BlockContext,
    msg: MsgLock,
) -> Result<MsgLockResponse, RpcError> {
    let delegator = parse_account("delegator_address", &msg.delegator_address)?;
    let validator = parse_validator("validator_address", &msg.validator_address)?;
    let amount = parse_positive_amount(&msg.amount)?;

    let receipt = keeper.lock(ctx, &delegator, &validator, amount)?;
    Ok(MsgLockResponse {
        locked: receipt.locked.to_string(),
        credit_minted: receipt.credit_minted.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Unlock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgUnlock {
    pub delegator_address: String,
    pub validator_address: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUnlockResponse {
    pub creation_height: i64,
    /// Amount placed in the unlocking lockup.
    pub amount: String,
    pub completion_time: DateTime<Utc>,
    pub unlock_time: DateTime<Utc>,
}

pub fn handle_unlock<S: KvStore>(
    keeper: &mut Keeper<S>,
    ctx: &BlockContext,
    msg: MsgUnlock,
) -> Result<MsgUnlockResponse, RpcError> {
    let delegator = parse_account("delegator_address", &msg.delegator_address)?;
    let validator = parse_validator("validator_address", &msg.validator_address)?;
    let amount = parse_positive_amount(&msg.amount)?;

    let receipt = keeper.unlock(ctx, &delegator, &validator, amount)?;
    Ok(MsgUnlockResponse {
        creation_height: receipt.creation_height,
        amount: receipt.amount.to_string(),
        completion_time: receipt.completion_time,
        unlock_time: receipt.unlock_time,
    })
}

// ---------------------------------------------------------------------------
// Redelegate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRedelegate {
    pub delegator_address: String,
    pub src_validator_address: String,
    pub dst_validator_address: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRedelegateResponse {
    pub completion_time: DateTime<Utc>,
}

pub fn handle_redelegate<S: KvStore>(
    keeper: &mut Keeper<S>,
    ctx: &BlockContext,
    msg: MsgRedelegate,
) -> Result<MsgRedelegateResponse, RpcError> {
    let delegator = parse_account("delegator_address", &msg.delegator_address)?;
    let src = parse_validator("src_validator_address", &msg.src_validator_address)?;
    let dst = parse_validator("dst_validator_address", &msg.dst_validator_address)?;
    let amount = parse_positive_amount(&msg.amount)?;

    let completion_time = keeper.redelegate(ctx, &delegator, &src, &dst, amount)?;
    Ok(MsgRedelegateResponse { completion_time })
}

// ---------------------------------------------------------------------------
// CancelUnlocking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgCancelUnlocking {
    pub delegator_address: String,
    pub validator_address: String,
    pub creation_height: i64,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelUnlockingResponse {}

pub fn handle_cancel_unlocking<S: KvStore>(
    keeper: &mut Keeper<S>,
    ctx: &BlockContext,
    msg: MsgCancelUnlocking,
) -> Result<MsgCancelUnlockingResponse, RpcError> {
    let delegator = parse_account("delegator_address", &msg.delegator_address)?;
    let validator = parse_validator("validator_address", &msg.validator_address)?;
    let amount = parse_positive_amount(&msg.amount)?;

    keeper.cancel_unlocking(ctx, &delegator, &validator, msg.creation_height, amount)?;
    Ok(MsgCancelUnlockingResponse {})
}
