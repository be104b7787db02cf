// crates/tier-store/src/keys.rs
//
// Key layout of the tier module store.
//
//   0x00                                        -> Params
//   0x01 | len(del) del | len(val) val          -> Lockup
//   0x02 | len(del) del | len(val) val | height -> UnlockingLockup
//   0x03 | len(del) del | len(val) val          -> InsuranceLockup
//
// Addresses are length-prefixed so that a delegator prefix never matches a
// longer address. Heights are big-endian with the sign bit flipped so byte
// order equals numeric order.

use tier_core::{AccAddress, ValAddress};

pub const PARAMS_KEY: &[u8] = &[0x00];
pub const LOCKUP_PREFIX: u8 = 0x01;
pub const UNLOCKING_LOCKUP_PREFIX: u8 = 0x02;
pub const INSURANCE_LOCKUP_PREFIX: u8 = 0x03;

fn push_length_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    // Addresses are at most 32 bytes; u8 length is sufficient.
    buf.push(bytes.len() as u8);
    buf.extend_from_slice(bytes);
}

fn delegator_prefix(prefix: u8, delegator: &AccAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + delegator.as_bytes().len());
    key.push(prefix);
    push_length_prefixed(&mut key, delegator.as_bytes());
    key
}

fn pair_key(prefix: u8, delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    let mut key = delegator_prefix(prefix, delegator);
    push_length_prefixed(&mut key, validator.as_bytes());
    key
}

fn encode_height(height: i64) -> [u8; 8] {
    ((height as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn lockup_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    pair_key(LOCKUP_PREFIX, delegator, validator)
}

pub fn lockups_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    delegator_prefix(LOCKUP_PREFIX, delegator)
}

pub fn unlocking_lockup_key(
    delegator: &AccAddress,
    validator: &ValAddress,
    creation_height: i64,
) -> Vec<u8> {
    let mut key = pair_key(UNLOCKING_LOCKUP_PREFIX, delegator, validator);
    key.extend_from_slice(&encode_height(creation_height));
    key
}

pub fn unlocking_lockups_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    delegator_prefix(UNLOCKING_LOCKUP_PREFIX, delegator)
}

pub fn insurance_lockup_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    pair_key(INSURANCE_LOCKUP_PREFIX, delegator, validator)
}

pub fn insurance_lockups_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    delegator_prefix(INSURANCE_LOCKUP_PREFIX, delegator)
}
