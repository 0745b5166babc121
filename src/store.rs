//! Read-only record store seam
//!
//! The engine only ever reads. Implementations return records with
//! `timestamp >= since`, ordered by timestamp.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::StoreError;
use crate::models::{MentalRecord, PhysicalRecord, SleepRecord, UserId};

pub trait RecordStore {
    fn list_physical_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PhysicalRecord>, StoreError>;

    fn list_mental_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<MentalRecord>, StoreError>;

    fn list_sleep_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>, StoreError>;
}

/// Per-user records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    physical: HashMap<UserId, Vec<PhysicalRecord>>,
    mental: HashMap<UserId, Vec<MentalRecord>>,
    sleep: HashMap<UserId, Vec<SleepRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_physical(&mut self, record: PhysicalRecord) {
        self.physical.entry(record.user_id).or_default().push(record);
    }

    pub fn add_mental(&mut self, record: MentalRecord) {
        self.mental.entry(record.user_id).or_default().push(record);
    }

    pub fn add_sleep(&mut self, record: SleepRecord) {
        self.sleep.entry(record.user_id).or_default().push(record);
    }
}

fn since_ordered<T: Clone>(
    records: Option<&Vec<T>>,
    since: DateTime<Utc>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut selected: Vec<T> = records
        .map(|all| {
            all.iter()
                .filter(|r| timestamp(r) >= since)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    selected.sort_by_key(|r| timestamp(r));
    selected
}

impl RecordStore for MemoryRecordStore {
    fn list_physical_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PhysicalRecord>, StoreError> {
        Ok(since_ordered(self.physical.get(&user_id), since, |r| r.timestamp))
    }

    fn list_mental_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<MentalRecord>, StoreError> {
        Ok(since_ordered(self.mental.get(&user_id), since, |r| r.timestamp))
    }

    fn list_sleep_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>, StoreError> {
        Ok(since_ordered(self.sleep.get(&user_id), since, |r| r.timestamp))
    }
}
