// crates/tier-rpc/src/handlers/query.rs
//
// Read-only queries: Params, Lockup, Lockups, UnlockingLockup,
// UnlockingLockups, InsuranceLockup.

use serde::{Deserialize, Serialize};

use tier_core::{InsuranceLockup, Lockup, TierError, UnlockingLockup};
use tier_economics::{Keeper, Params};
use tier_store::KvStore;

use super::{parse_account, parse_validator};
use crate::error::RpcError;
use crate::pagination::{PageRequest, PageResponse};

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryParamsRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsResponse {
    pub params: Params,
}

pub fn handle_params<S: KvStore>(
    keeper: &Keeper<S>,
    _request: QueryParamsRequest,
) -> Result<QueryParamsResponse, RpcError> {
    Ok(QueryParamsResponse {
        params: keeper.params()?,
    })
}

// ---------------------------------------------------------------------------
// Lockup / Lockups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLockupRequest {
    pub delegator_address: String,
    pub validator_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLockupResponse {
    pub lockup: Lockup,
}

pub fn handle_lockup<S: KvStore>(
    keeper: &Keeper<S>,
    request: QueryLockupRequest,
) -> Result<QueryLockupResponse, RpcError> {
    let delegator = parse_account("delegator_address", &request.delegator_address)?;
    let validator = parse_validator("validator_address", &request.validator_address)?;
    let lockup = keeper
        .store()
        .get_lockup(&delegator, &validator)?
        .ok_or_else(|| {
            TierError::NotFound(format!(
                "lockup for delegator {} and validator {}",
                delegator, validator
            ))
        })?;
    Ok(QueryLockupResponse { lockup })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLockupsRequest {
    pub delegator_address: String,
    #[serde(default)]
    pub pagination: Option<PageRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLockupsResponse {
    pub lockups: Vec<Lockup>,
    pub pagination: PageResponse,
}

pub fn handle_lockups<S: KvStore>(
    keeper: &Keeper<S>,
    request: QueryLockupsRequest,
) -> Result<QueryLockupsResponse, RpcError> {
    let delegator = parse_account("delegator_address", &request.delegator_address)?;
    let query = request.pagination.unwrap_or_default().to_query()?;
    let page = keeper.store().page_lockups_by_delegator(&delegator, &query)?;
    Ok(QueryLockupsResponse {
        pagination: PageResponse::from_page(&page),
        lockups: page.items,
    })
}

// ---------------------------------------------------------------------------
// UnlockingLockup / UnlockingLockups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUnlockingLockupRequest {
    pub delegator_address: String,
    pub validator_address: String,
    pub creation_height: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryUnlockingLockupResponse {
    pub unlocking_lockup: UnlockingLockup,
}

pub fn handle_unlocking_lockup<S: KvStore>(
    keeper: &Keeper<S>,
    request: QueryUnlockingLockupRequest,
) -> Result<QueryUnlockingLockupResponse, RpcError> {
    let delegator = parse_account("delegator_address", &request.delegator_address)?;
    let validator = parse_validator("validator_address", &request.validator_address)?;
    let unlocking_lockup = keeper
        .store()
        .get_unlocking_lockup(&delegator, &validator, request.creation_height)?
        .ok_or_else(|| {
            TierError::NotFound(format!(
                "unlocking lockup for delegator {}, validator {}, height {}",
                delegator, validator, request.creation_height
            ))
        })?;
    Ok(QueryUnlockingLockupResponse { unlocking_lockup })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUnlockingLockupsRequest {
    pub delegator_address: String,
    #[serde(default)]
    pub pagination: Option<PageRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryUnlockingLockupsResponse {
    pub unlocking_lockups: Vec<UnlockingLockup>,
    pub pagination: PageResponse,
}

pub fn handle_unlocking_lockups<S: KvStore>(
    keeper: &Keeper<S>,
    request: QueryUnlockingLockupsRequest,
) -> Result<QueryUnlockingLockupsResponse, RpcError> {
    let delegator = parse_account("delegator_address", &request.delegator_address)?;
    let query = request.pagination.unwrap_or_default().to_query()?;
    let page = keeper
        .store()
        .page_unlocking_lockups_by_delegator(&delegator, &query)?;
    Ok(QueryUnlockingLockupsResponse {
        pagination: PageResponse::from_page(&page),
        unlocking_lockups: page.items,
    })
}

// ---------------------------------------------------------------------------
// InsuranceLockup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInsuranceLockupRequest {
    pub delegator_address: String,
    pub validator_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInsuranceLockupResponse {
    pub insurance_lockup: InsuranceLockup,
}

pub fn handle_insurance_lockup<S: KvStore>(
    keeper: &Keeper<S>,
    request: QueryInsuranceLockupRequest,
) -> Result<QueryInsuranceLockupResponse, RpcError> {
    let delegator = parse_account("delegator_address", &request.delegator_address)?;
    let validator = parse_validator("validator_address", &request.validator_address)?;
    let insurance_lockup = keeper
        .store()
        .get_insurance_lockup(&delegator, &validator)?
        .ok_or_else(|| {
            TierError::NotFound(format!(
                "insurance lockup for delegator {} and validator {}",
                delegator, validator
            ))
        })?;
    Ok(QueryInsuranceLockupResponse { insurance_lockup })
}
