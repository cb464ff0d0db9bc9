//! Persistence collaborator
//!
//! The store loads its initial records once through `load_all` and calls
//! `persist` synchronously after every accepted create, update and delete,
//! before the change becomes visible.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::record::{Record, SlotId};
use crate::storage::{StorageError, StorageResult};

pub trait Persistence: Send + Sync {
    /// Every slot's latest record, tombstones included, in any order
    fn load_all(&self) -> StorageResult<Vec<Record>>;

    /// Durably write one record generation
    fn persist(&self, record: &Record) -> StorageResult<()>;
}

/// In-memory persistence for embedding and tests.
///
/// Keeps every persisted generation so callers can inspect the write log,
/// and can be told to fail writes.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    initial: Vec<Record>,
    log: Mutex<Vec<Record>>,
    fail_writes: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the records `load_all` returns
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            initial: records,
            ..Self::default()
        }
    }

    /// Make subsequent `persist` calls fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every generation persisted so far, in write order
    pub fn persisted(&self) -> Vec<Record> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load_all(&self) -> StorageResult<Vec<Record>> {
        let mut latest: BTreeMap<SlotId, Record> = BTreeMap::new();
        for record in &self.initial {
            latest.insert(record.slot(), record.clone());
        }
        for record in self.log.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            latest.insert(record.slot(), record.clone());
        }
        Ok(latest.into_values().collect())
    }

    fn persist(&self, record: &Record) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write_rejected(format!("write of slot {} refused", record.slot())));
        }
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
        Ok(())
    }
}
