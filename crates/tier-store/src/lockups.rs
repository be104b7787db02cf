// crates/tier-store/src/lockups.rs
//
// Typed access to tier records on top of a `KvStore`.
//
// Records are stored as JSON values under the keys defined in keys.rs.
// Iteration returns lazy `RecordIter`s that decode one record per step;
// callers that write while walking a scan collect it first.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use tier_core::{
    checked_add, AccAddress, Amount, InsuranceLockup, Lockup, TierError, UnlockingLockup,
    ValAddress,
};

use crate::keys;
use crate::kv::{KvIter, KvStore};
use crate::pagination::{paginate, Page, PageQuery};

/// Lazy iterator decoding JSON records from a prefix scan.
pub struct RecordIter<'a, T> {
    inner: KvIter<'a>,
    _marker: PhantomData<T>,
}

impl<'a, T> RecordIter<'a, T> {
    fn new(inner: KvIter<'a>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: DeserializeOwned> Iterator for RecordIter<'a, T> {
    type Item = Result<T, TierError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(entry.and_then(|(_, value)| serde_json::from_slice(&value).map_err(TierError::from)))
    }
}

/// The tier module's durable state: lockups, unlocking lockups, insurance
/// lockups, and params.
pub struct LockupStore<S: KvStore> {
    kv: S,
}

impl<S: KvStore> LockupStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn into_inner(self) -> S {
        self.kv
    }

    fn get_record<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, TierError> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_record<T: Serialize>(&mut self, key: &[u8], record: &T) -> Result<(), TierError> {
        let bytes = serde_json::to_vec(record)?;
        self.kv.set(key, &bytes)
    }

    fn scan<T>(&self, prefix: &[u8]) -> RecordIter<'_, T> {
        RecordIter::new(self.kv.prefix_iter(prefix, None))
    }

    // -----------------------------------------------------------------------
    // Params
    // -----------------------------------------------------------------------

    pub fn get_params<T: DeserializeOwned>(&self) -> Result<Option<T>, TierError> {
        self.get_record(keys::PARAMS_KEY)
    }

    pub fn set_params<T: Serialize>(&mut self, params: &T) -> Result<(), TierError> {
        self.put_record(keys::PARAMS_KEY, params)
    }

    // -----------------------------------------------------------------------
    // Lockups
    // -----------------------------------------------------------------------

    pub fn get_lockup(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Lockup>, TierError> {
        self.get_record(&keys::lockup_key(delegator, validator))
    }

    /// Locked amount for the pair, zero when no lockup exists.
    pub fn lockup_amount(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Amount, TierError> {
        Ok(self
            .get_lockup(delegator, validator)?
            .map(|l| l.amount)
            .unwrap_or(0))
    }

    /// Overwrite the lockup amount. Zero deletes the record.
    pub fn set_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<(), TierError> {
        let key = keys::lockup_key(delegator, validator);
        if amount == 0 {
            return self.kv.delete(&key);
        }
        let lockup = Lockup {
            delegator: delegator.clone(),
            validator: validator.clone(),
            amount,
        };
        self.put_record(&key, &lockup)
    }

    /// Add to the lockup, creating it if absent. Returns the new amount.
    pub fn add_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Amount, TierError> {
        let current = self.lockup_amount(delegator, validator)?;
        let updated = checked_add(current, amount)?;
        self.set_lockup(delegator, validator, updated)?;
        Ok(updated)
    }

    /// Subtract from an existing lockup. Returns the remaining amount.
    ///
    /// Fails with `NotFound` when the lockup does not exist and with
    /// `InvalidAmount` when `amount` exceeds it. Reaching zero deletes the record.
    pub fn subtract_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Amount, TierError> {
        let lockup = self.get_lockup(delegator, validator)?.ok_or_else(|| {
            TierError::NotFound(format!(
                "lockup for delegator {} and validator {}",
                delegator, validator
            ))
        })?;
        if amount > lockup.amount {
            return Err(TierError::InvalidAmount(format!(
                "cannot subtract {} from lockup of {} (delegator {}, validator {})",
                amount, lockup.amount, delegator, validator
            )));
        }
        let remaining = lockup.amount - amount;
        self.set_lockup(delegator, validator, remaining)?;
        Ok(remaining)
    }

    pub fn remove_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<(), TierError> {
        self.kv.delete(&keys::lockup_key(delegator, validator))
    }

    /// Every lockup, ordered by (delegator, validator).
    pub fn iter_lockups(&self) -> RecordIter<'_, Lockup> {
        self.scan(&[keys::LOCKUP_PREFIX])
    }

    pub fn iter_lockups_by_delegator(&self, delegator: &AccAddress) -> RecordIter<'_, Lockup> {
        self.scan(&keys::lockups_by_delegator_prefix(delegator))
    }

    /// Lockups matching `predicate`. Decode errors are passed through.
    pub fn filter_lockups<'a, F>(
        &'a self,
        predicate: F,
    ) -> impl Iterator<Item = Result<Lockup, TierError>> + 'a
    where
        F: Fn(&Lockup) -> bool + 'a,
    {
        self.iter_lockups().filter(move |entry| match entry {
            Ok(lockup) => predicate(lockup),
            Err(_) => true,
        })
    }

    /// Every lockup against `validator`.
    pub fn lockups_by_validator(&self, validator: &ValAddress) -> Result<Vec<Lockup>, TierError> {
        self.filter_lockups(|l| &l.validator == validator).collect()
    }

    /// A delegator's locked amount summed across validators.
    pub fn total_amount_by_addr(&self, delegator: &AccAddress) -> Result<Amount, TierError> {
        let mut total: Amount = 0;
        for lockup in self.iter_lockups_by_delegator(delegator) {
            total = checked_add(total, lockup?.amount)?;
        }
        Ok(total)
    }

    /// Locked amount summed across every lockup.
    pub fn total_lockups_amount(&self) -> Result<Amount, TierError> {
        let mut total: Amount = 0;
        for lockup in self.iter_lockups() {
            total = checked_add(total, lockup?.amount)?;
        }
        Ok(total)
    }

    /// Locked amount against `validator` summed across delegators.
    pub fn total_amount_by_validator(&self, validator: &ValAddress) -> Result<Amount, TierError> {
        let mut total: Amount = 0;
        for lockup in self.filter_lockups(|l| &l.validator == validator) {
            total = checked_add(total, lockup?.amount)?;
        }
        Ok(total)
    }

    /// Per-delegator totals across all validators.
    pub fn totals_by_delegator(&self) -> Result<BTreeMap<AccAddress, Amount>, TierError> {
        let mut totals: BTreeMap<AccAddress, Amount> = BTreeMap::new();
        for lockup in self.iter_lockups() {
            let lockup = lockup?;
            let entry = totals.entry(lockup.delegator).or_insert(0);
            *entry = checked_add(*entry, lockup.amount)?;
        }
        Ok(totals)
    }

    /// Distinct validators that currently have at least one lockup.
    pub fn validators_with_lockups(&self) -> Result<BTreeSet<ValAddress>, TierError> {
        self.iter_lockups()
            .map(|entry| entry.map(|l| l.validator))
            .collect()
    }

    pub fn page_lockups_by_delegator(
        &self,
        delegator: &AccAddress,
        query: &PageQuery,
    ) -> Result<Page<Lockup>, TierError> {
        paginate(&self.kv, &keys::lockups_by_delegator_prefix(delegator), query)
    }

    // -----------------------------------------------------------------------
    // Unlocking lockups
    // -----------------------------------------------------------------------

    pub fn get_unlocking_lockup(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
    ) -> Result<Option<UnlockingLockup>, TierError> {
        self.get_record(&keys::unlocking_lockup_key(
            delegator,
            validator,
            creation_height,
        ))
    }

    pub fn set_unlocking_lockup(&mut self, record: &UnlockingLockup) -> Result<(), TierError> {
        let key = keys::unlocking_lockup_key(
            &record.delegator,
            &record.validator,
            record.creation_height,
        );
        self.put_record(&key, record)
    }

    pub fn remove_unlocking_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
    ) -> Result<(), TierError> {
        self.kv.delete(&keys::unlocking_lockup_key(
            delegator,
            validator,
            creation_height,
        ))
    }

    /// Reduce an unlocking lockup. Returns the remaining record, or `None`
    /// when it reached zero and was deleted.
    pub fn subtract_unlocking_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        creation_height: i64,
        amount: Amount,
    ) -> Result<Option<UnlockingLockup>, TierError> {
        let mut record = self
            .get_unlocking_lockup(delegator, validator, creation_height)?
            .ok_or_else(|| {
                TierError::NotFound(format!(
                    "unlocking lockup for delegator {}, validator {}, height {}",
                    delegator, validator, creation_height
                ))
            })?;
        if amount > record.amount {
            return Err(TierError::InvalidAmount(format!(
                "cannot subtract {} from unlocking lockup of {} (delegator {}, validator {}, height {})",
                amount, record.amount, delegator, validator, creation_height
            )));
        }
        record.amount -= amount;
        if record.amount == 0 {
            self.remove_unlocking_lockup(delegator, validator, creation_height)?;
            return Ok(None);
        }
        self.set_unlocking_lockup(&record)?;
        Ok(Some(record))
    }

    pub fn iter_unlocking_lockups(&self) -> RecordIter<'_, UnlockingLockup> {
        self.scan(&[keys::UNLOCKING_LOCKUP_PREFIX])
    }

    pub fn iter_unlocking_lockups_by_delegator(
        &self,
        delegator: &AccAddress,
    ) -> RecordIter<'_, UnlockingLockup> {
        self.scan(&keys::unlocking_lockups_by_delegator_prefix(delegator))
    }

    pub fn page_unlocking_lockups_by_delegator(
        &self,
        delegator: &AccAddress,
        query: &PageQuery,
    ) -> Result<Page<UnlockingLockup>, TierError> {
        paginate(
            &self.kv,
            &keys::unlocking_lockups_by_delegator_prefix(delegator),
            query,
        )
    }

    // -----------------------------------------------------------------------
    // Insurance lockups
    // -----------------------------------------------------------------------

    pub fn get_insurance_lockup(
        &self,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<InsuranceLockup>, TierError> {
        self.get_record(&keys::insurance_lockup_key(delegator, validator))
    }

    /// Add to the insurance lockup, creating it if absent. Returns the new amount.
    pub fn add_insurance_lockup(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> Result<Amount, TierError> {
        let current = self
            .get_insurance_lockup(delegator, validator)?
            .map(|l| l.amount)
            .unwrap_or(0);
        let updated = checked_add(current, amount)?;
        let record = InsuranceLockup {
            delegator: delegator.clone(),
            validator: validator.clone(),
            amount: updated,
        };
        self.put_record(&keys::insurance_lockup_key(delegator, validator), &record)?;
        Ok(updated)
    }

    pub fn iter_insurance_lockups(&self) -> RecordIter<'_, InsuranceLockup> {
        self.scan(&[keys::INSURANCE_LOCKUP_PREFIX])
    }

    pub fn iter_insurance_lockups_by_delegator(
        &self,
        delegator: &AccAddress,
    ) -> RecordIter<'_, InsuranceLockup> {
        self.scan(&keys::insurance_lockups_by_delegator_prefix(delegator))
    }

    /// Insurance-backed amount against `validator` summed across delegators.
    pub fn total_insurance_by_validator(&self, validator: &ValAddress) -> Result<Amount, TierError> {
        let mut total: Amount = 0;
        for record in self.iter_insurance_lockups() {
            let record = record?;
            if &record.validator == validator {
                total = checked_add(total, record.amount)?;
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemStore;
    use chrono::{TimeZone, Utc};

    fn del(b: u8) -> AccAddress {
        AccAddress::from_bytes([b; 20])
    }

    fn val(b: u8) -> ValAddress {
        ValAddress::from_bytes([b; 20])
    }

    fn store() -> LockupStore<MemStore> {
        LockupStore::new(MemStore::new())
    }

    fn unlocking(d: u8, v: u8, height: i64, amount: Amount) -> UnlockingLockup {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        UnlockingLockup {
            delegator: del(d),
            validator: val(v),
            creation_height: height,
            amount,
            completion_time: t,
            unlock_time: t + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_add_creates_and_accumulates() {
        let mut s = store();
        assert_eq!(s.add_lockup(&del(1), &val(1), 100).unwrap(), 100);
        assert_eq!(s.add_lockup(&del(1), &val(1), 50).unwrap(), 150);
        assert_eq!(s.lockup_amount(&del(1), &val(1)).unwrap(), 150);
    }

    #[test]
    fn test_subtract_not_found() {
        let mut s = store();
        let err = s.subtract_lockup(&del(1), &val(1), 1).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_subtract_over_amount_leaves_record_untouched() {
        let mut s = store();
        s.add_lockup(&del(1), &val(1), 100).unwrap();
        let err = s.subtract_lockup(&del(1), &val(1), 101).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
        assert_eq!(s.lockup_amount(&del(1), &val(1)).unwrap(), 100);
    }

    #[test]
    fn test_subtract_to_zero_deletes() {
        let mut s = store();
        s.add_lockup(&del(1), &val(1), 100).unwrap();
        assert_eq!(s.subtract_lockup(&del(1), &val(1), 40).unwrap(), 60);
        assert_eq!(s.subtract_lockup(&del(1), &val(1), 60).unwrap(), 0);
        assert!(s.get_lockup(&del(1), &val(1)).unwrap().is_none());
    }

    #[test]
    fn test_totals() {
        let mut s = store();
        s.add_lockup(&del(1), &val(1), 100).unwrap();
        s.add_lockup(&del(1), &val(2), 200).unwrap();
        s.add_lockup(&del(2), &val(1), 50).unwrap();

        assert_eq!(s.total_amount_by_addr(&del(1)).unwrap(), 300);
        assert_eq!(s.total_amount_by_addr(&del(3)).unwrap(), 0);
        assert_eq!(s.total_lockups_amount().unwrap(), 350);
        assert_eq!(s.total_amount_by_validator(&val(1)).unwrap(), 150);
        assert_eq!(s.lockups_by_validator(&val(1)).unwrap().len(), 2);

        let totals = s.totals_by_delegator().unwrap();
        assert_eq!(totals.get(&del(1)), Some(&300));
        assert_eq!(totals.get(&del(2)), Some(&50));

        let validators = s.validators_with_lockups().unwrap();
        assert_eq!(validators.len(), 2);
    }

    #[test]
    fn test_records_of_other_kinds_are_not_scanned_as_lockups() {
        let mut s = store();
        s.add_lockup(&del(1), &val(1), 10).unwrap();
        s.add_insurance_lockup(&del(1), &val(1), 5).unwrap();
        s.set_unlocking_lockup(&unlocking(1, 1, 7, 3)).unwrap();
        s.set_params(&42u32).unwrap();
        assert_eq!(s.iter_lockups().count(), 1);
        assert_eq!(s.iter_insurance_lockups().count(), 1);
        assert_eq!(s.iter_unlocking_lockups().count(), 1);
        assert_eq!(s.get_params::<u32>().unwrap(), Some(42));
    }

    #[test]
    fn test_concurrent_unlocks_do_not_collide() {
        let mut s = store();
        s.set_unlocking_lockup(&unlocking(1, 1, 10, 100)).unwrap();
        s.set_unlocking_lockup(&unlocking(1, 1, 11, 200)).unwrap();
        let all: Vec<UnlockingLockup> = s
            .iter_unlocking_lockups_by_delegator(&del(1))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].creation_height, 10);
        assert_eq!(all[1].creation_height, 11);
    }

    #[test]
    fn test_subtract_unlocking_partial_and_full() {
        let mut s = store();
        s.set_unlocking_lockup(&unlocking(1, 1, 10, 100)).unwrap();

        let remaining = s.subtract_unlocking_lockup(&del(1), &val(1), 10, 30).unwrap();
        assert_eq!(remaining.map(|r| r.amount), Some(70));

        let err = s.subtract_unlocking_lockup(&del(1), &val(1), 10, 71).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");

        assert!(s.subtract_unlocking_lockup(&del(1), &val(1), 10, 70).unwrap().is_none());
        assert!(s.get_unlocking_lockup(&del(1), &val(1), 10).unwrap().is_none());

        let err = s.subtract_unlocking_lockup(&del(1), &val(1), 10, 1).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_insurance_accumulates() {
        let mut s = store();
        assert_eq!(s.add_insurance_lockup(&del(1), &val(1), 5).unwrap(), 5);
        assert_eq!(s.add_insurance_lockup(&del(1), &val(1), 7).unwrap(), 12);
        s.add_insurance_lockup(&del(2), &val(1), 3).unwrap();
        assert_eq!(s.total_insurance_by_validator(&val(1)).unwrap(), 15);
        assert_eq!(s.iter_insurance_lockups_by_delegator(&del(1)).count(), 1);
    }

    #[test]
    fn test_page_lockups_by_delegator() {
        let mut s = store();
        for v in 1..=5u8 {
            s.add_lockup(&del(1), &val(v), v as Amount).unwrap();
        }
        s.add_lockup(&del(2), &val(1), 99).unwrap();

        let query = PageQuery {
            limit: 3,
            count_total: true,
            ..Default::default()
        };
        let page = s.page_lockups_by_delegator(&del(1), &query).unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, Some(5));
        assert!(page.next_key.is_some());
    }
}
