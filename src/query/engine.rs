//! Query execution
//!
//! `find` produces candidate slots from one scan of the store. By the time a
//! caller consumes a candidate another session may have changed or deleted
//! it, so every candidate goes through `verify` against the live record
//! before it is surfaced. Candidates that fail are dropped silently.

use std::sync::Arc;

use super::matcher::Criteria;
use crate::record::{Record, SlotId};
use crate::schema::SchemaError;
use crate::store::{RecordStore, StoreResult};

pub struct QueryEngine<'a> {
    store: &'a RecordStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    fn check_arity(&self, criteria: &Criteria) -> StoreResult<()> {
        let expected = self.store.schema().field_count();
        if criteria.arity() != expected {
            return Err(SchemaError::criteria_invalid(format!(
                "expected {} entries, got {}",
                expected,
                criteria.arity()
            ))
            .into());
        }
        Ok(())
    }

    /// Candidate slots in ascending slot order
    pub fn find(&self, criteria: &Criteria) -> StoreResult<Vec<SlotId>> {
        self.check_arity(criteria)?;
        self.store.metrics().increment_queries();
        Ok(self
            .store
            .snapshot()
            .iter()
            .filter(|record| criteria.matches(record))
            .map(|record| record.slot())
            .collect())
    }

    /// Re-read `slot` and re-match it. `None` if it is gone or no longer
    /// matches.
    pub fn verify(&self, slot: SlotId, criteria: &Criteria) -> Option<Arc<Record>> {
        self.store.read(slot).ok().filter(|record| criteria.matches(record))
    }

    /// `find` followed by `verify` of every candidate
    pub fn search(&self, criteria: &Criteria) -> StoreResult<Vec<Arc<Record>>> {
        let candidates = self.find(criteria)?;
        let total = candidates.len();
        let verified: Vec<Arc<Record>> = candidates
            .into_iter()
            .filter_map(|slot| self.verify(slot, criteria))
            .collect();

        let dropped = (total - verified.len()) as u64;
        if dropped > 0 {
            self.store.metrics().add_candidates_dropped(dropped);
        }
        Ok(verified)
    }
}
