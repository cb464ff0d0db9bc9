//! Session coordinator
//!
//! Tracks connected sessions and, per session, the last query's result set
//! with its page cursor and the version last observed for each slot.
//! Updates and deletes issued through a session commit against that
//! remembered version, so a change made by anyone else in between turns
//! into `Stale` instead of being overwritten.
//!
//! The session map mutex is never held across a store call that can block.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::SessionId;
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};
use crate::query::{Criteria, QueryEngine};
use crate::record::{FieldValue, Record, SlotId};
use crate::store::{RecordStore, StoreError, StoreResult};

/// Records returned per `next_page` call
pub const DEFAULT_PAGE_SIZE: usize = 50;

struct ResultSet {
    slots: Vec<SlotId>,
    criteria: Criteria,
    only_modifiable: bool,
    cursor: usize,
}

impl ResultSet {
    fn remaining(&self) -> usize {
        self.slots.len().saturating_sub(self.cursor)
    }
}

struct SessionState {
    connected_at: DateTime<Utc>,
    results: Option<ResultSet>,
    /// slot -> version last seen by this session
    observed: HashMap<SlotId, u64>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connected_at: Utc::now(),
            results: None,
            observed: HashMap::new(),
        }
    }
}

/// Point-in-time view of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub connected_at: DateTime<Utc>,
    pub result_count: usize,
    pub result_remaining: usize,
    pub held_slot: Option<SlotId>,
}

pub struct SessionCoordinator {
    store: Arc<RecordStore>,
    sessions: Mutex<HashMap<SessionId, SessionState>>,
    page_size: usize,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // Each critical section is a single map/field update
    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the session's state, failing for unknown sessions
    fn with_session<T>(&self, session: SessionId, f: impl FnOnce(&mut SessionState) -> T) -> StoreResult<T> {
        let mut sessions = self.sessions();
        let state = sessions.get_mut(&session).ok_or(StoreError::UnknownSession(session))?;
        Ok(f(state))
    }

    fn ensure_known(&self, session: SessionId) -> StoreResult<()> {
        self.with_session(session, |_| ())
    }

    // ==================
    // Membership
    // ==================

    /// Add `session` to the connected set. Re-registering is a no-op.
    pub fn register(&self, session: SessionId) {
        let inserted = {
            let mut sessions = self.sessions();
            if sessions.contains_key(&session) {
                false
            } else {
                sessions.insert(session, SessionState::new());
                true
            }
        };
        if inserted {
            let id = session.to_string();
            log_event_with_fields(Event::SessionRegistered, &[("session", id.as_str())]);
        }
    }

    /// Remove `session`, dropping its result set and releasing any slot it
    /// still holds. Returns the released slots.
    pub fn unregister(&self, session: SessionId) -> Vec<SlotId> {
        let removed = self.sessions().remove(&session).is_some();
        let released = self.store.release_all(session);

        let id = session.to_string();
        for slot in &released {
            let slot = slot.to_string();
            log_event_at(
                Severity::Warn,
                Event::SessionLockReclaimed,
                &[("session", id.as_str()), ("slot", slot.as_str())],
            );
        }
        if removed {
            log_event_with_fields(Event::SessionUnregistered, &[("session", id.as_str())]);
        }
        released
    }

    pub fn is_registered(&self, session: SessionId) -> bool {
        self.sessions().contains_key(&session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    pub fn session_info(&self, session: SessionId) -> StoreResult<SessionInfo> {
        let held_slot = self.store.held_by(session);
        self.with_session(session, |state| SessionInfo {
            id: session,
            connected_at: state.connected_at,
            result_count: state.results.as_ref().map_or(0, |r| r.slots.len()),
            result_remaining: state.results.as_ref().map_or(0, ResultSet::remaining),
            held_slot,
        })
    }

    // ==================
    // Queries
    // ==================

    /// Run a query for `session` and keep its verified matches for paging.
    ///
    /// With `only_modifiable`, records the modification policy currently
    /// refuses are left out. Returns the number of matches.
    pub fn query(&self, session: SessionId, criteria: Criteria, only_modifiable: bool) -> StoreResult<usize> {
        self.ensure_known(session)?;

        let engine = QueryEngine::new(&self.store);
        let matches = engine.search(&criteria).map_err(|e| {
            let id = session.to_string();
            let reason = e.to_string();
            log_event_at(
                Severity::Warn,
                Event::QueryRejected,
                &[("session", id.as_str()), ("reason", reason.as_str())],
            );
            e
        })?;

        let slots: Vec<SlotId> = matches
            .iter()
            .filter(|record| !only_modifiable || self.store.is_modifiable(record))
            .map(|record| record.slot())
            .collect();
        let count = slots.len();

        self.with_session(session, |state| {
            state.results = Some(ResultSet {
                slots,
                criteria,
                only_modifiable,
                cursor: 0,
            });
        })?;

        let id = session.to_string();
        let count_str = count.to_string();
        log_event_at(
            Severity::Trace,
            Event::QueryExecuted,
            &[("session", id.as_str()), ("matches", count_str.as_str())],
        );
        Ok(count)
    }

    /// Next page of the session's result set.
    ///
    /// Each record is re-verified against the live store; ones deleted or
    /// changed so they no longer match are skipped, so a page may be short.
    /// After the last match every call returns an empty page.
    pub fn next_page(&self, session: SessionId) -> StoreResult<Vec<Arc<Record>>> {
        let page = self.with_session(session, |state| {
            let page_size = self.page_size;
            state.results.as_mut().and_then(|results| {
                let start = results.cursor.min(results.slots.len());
                let end = (start + page_size).min(results.slots.len());
                results.cursor = end;
                if start == end {
                    None
                } else {
                    Some((
                        results.slots[start..end].to_vec(),
                        results.criteria.clone(),
                        results.only_modifiable,
                    ))
                }
            })
        })?;

        let Some((slots, criteria, only_modifiable)) = page else {
            return Ok(Vec::new());
        };

        let engine = QueryEngine::new(&self.store);
        let requested = slots.len();
        let records: Vec<Arc<Record>> = slots
            .into_iter()
            .filter_map(|slot| engine.verify(slot, &criteria))
            .filter(|record| !only_modifiable || self.store.is_modifiable(record))
            .collect();

        let dropped = (requested - records.len()) as u64;
        if dropped > 0 {
            self.store.metrics().add_candidates_dropped(dropped);
        }

        self.with_session(session, |state| {
            for record in &records {
                state.observed.insert(record.slot(), record.version());
            }
        })?;
        Ok(records)
    }

    /// Matches not yet handed out by `next_page`
    pub fn result_remaining(&self, session: SessionId) -> StoreResult<usize> {
        self.with_session(session, |state| state.results.as_ref().map_or(0, ResultSet::remaining))
    }

    // ==================
    // Record operations
    // ==================

    /// Create a record; the session observes its initial version
    pub fn create(&self, session: SessionId, fields: Vec<FieldValue>) -> StoreResult<SlotId> {
        self.ensure_known(session)?;
        let slot = self.store.create(fields)?;
        if let Ok(record) = self.store.read(slot) {
            self.with_session(session, |state| {
                state.observed.insert(slot, record.version());
            })?;
        }
        Ok(slot)
    }

    /// Read `slot` and remember the version seen
    pub fn read(&self, session: SessionId, slot: SlotId) -> StoreResult<Arc<Record>> {
        self.ensure_known(session)?;
        let record = self.store.read(slot)?;
        self.with_session(session, |state| {
            state.observed.insert(slot, record.version());
        })?;
        Ok(record)
    }

    /// Lock `slot` for `session`, blocking while another session holds it.
    ///
    /// If the session never observed the slot, the version current at
    /// lock time becomes its observed version.
    pub fn lock(&self, session: SessionId, slot: SlotId) -> StoreResult<()> {
        self.ensure_known(session)?;
        self.store.lock(slot, session)?;
        self.observe_if_absent(session, slot)
    }

    pub fn unlock(&self, session: SessionId, slot: SlotId) -> StoreResult<()> {
        self.ensure_known(session)?;
        self.store.unlock(slot, session)
    }

    fn observe_if_absent(&self, session: SessionId, slot: SlotId) -> StoreResult<()> {
        let current = self.store.read(slot)?.version();
        self.with_session(session, |state| {
            state.observed.entry(slot).or_insert(current);
        })
    }

    /// Version of `slot` last observed by `session`
    pub fn observed_version(&self, session: SessionId, slot: SlotId) -> StoreResult<Option<u64>> {
        self.with_session(session, |state| state.observed.get(&slot).copied())
    }

    /// Update `slot` against the session's observed version. The session
    /// must hold the slot lock.
    pub fn update(&self, session: SessionId, slot: SlotId, fields: Vec<FieldValue>) -> StoreResult<u64> {
        // Holding the lock implies an observed version; without one the
        // store rejects on the missing lock before comparing versions.
        let expected = self.observed_version(session, slot)?.unwrap_or(0);
        let version = self.store.update(slot, session, fields, expected)?;
        self.with_session(session, |state| {
            state.observed.insert(slot, version);
        })?;
        Ok(version)
    }

    /// Delete `slot` against the session's observed version. The session
    /// must hold the slot lock.
    pub fn delete(&self, session: SessionId, slot: SlotId) -> StoreResult<u64> {
        let expected = self.observed_version(session, slot)?.unwrap_or(0);
        let version = self.store.delete(slot, session, expected)?;
        // The slot number may be reused by a later create
        self.with_session(session, |state| {
            state.observed.remove(&slot);
        })?;
        Ok(version)
    }

    /// Lock, update, unlock. The lock is released on every exit path.
    pub fn modify(&self, session: SessionId, slot: SlotId, fields: Vec<FieldValue>) -> StoreResult<u64> {
        self.ensure_known(session)?;
        let guard = self.store.lock_scoped(slot, session)?;
        self.observe_if_absent(session, slot)?;
        let version = self.update(session, slot, fields)?;
        guard.release()?;
        Ok(version)
    }

    /// Lock, delete, unlock. The lock is released on every exit path.
    pub fn remove(&self, session: SessionId, slot: SlotId) -> StoreResult<u64> {
        self.ensure_known(session)?;
        let guard = self.store.lock_scoped(slot, session)?;
        self.observe_if_absent(session, slot)?;
        let version = self.delete(session, slot)?;
        guard.release()?;
        Ok(version)
    }
}
