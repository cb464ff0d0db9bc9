//! Record store
//!
//! The authoritative in-memory map from slot to current record. Records
//! are immutable `Arc` values: readers clone the `Arc` under a short read
//! lock and never wait on writers holding slot locks.
//!
//! Write path for update/delete:
//! 1. caller holds the slot lock
//! 2. slot is live, version matches, policy allows the change
//! 3. successor record persisted
//! 4. successor swapped into the map
//!
//! A failed persist leaves the map untouched.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::persistence::Persistence;
use crate::lock::{LockError, LockTable, SlotGuard};
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity, StoreMetrics};
use crate::policy::{Clock, ModificationPolicy, PolicyConfig, SystemClock};
use crate::record::{FieldValue, Record, SlotId, INITIAL_VERSION};
use crate::schema::{Schema, SchemaError, SchemaValidator};
use crate::session::SessionId;

/// Index = slot number. `None` marks a slot number never written.
type SlotTable = Vec<Option<Arc<Record>>>;

pub struct RecordStore {
    schema: Schema,
    slots: RwLock<SlotTable>,
    locks: LockTable,
    /// Serializes slot allocation
    allocation: Mutex<()>,
    persistence: Arc<dyn Persistence>,
    policy: Arc<dyn ModificationPolicy>,
    clock: Arc<dyn Clock>,
    metrics: Arc<StoreMetrics>,
}

impl RecordStore {
    /// Open the store over whatever `persistence` currently holds.
    ///
    /// Every loaded record, tombstones included, must fit `schema`.
    pub fn open(
        schema: Schema,
        persistence: Arc<dyn Persistence>,
        policy: Arc<dyn ModificationPolicy>,
    ) -> StoreResult<Self> {
        schema
            .validate_structure()
            .map_err(|reason| SchemaError::malformed_schema(&schema.name, reason))?;

        let loaded = persistence.load_all()?;
        let validator = SchemaValidator::new(&schema);
        let mut slots: SlotTable = Vec::new();

        for record in loaded {
            validator.validate_fields(record.fields())?;
            let index = record.slot() as usize;
            if index >= slots.len() {
                slots.resize(index + 1, None);
            }
            slots[index] = Some(Arc::new(record));
        }

        let live = slots.iter().flatten().filter(|r| !r.is_deleted()).count();
        let total = slots.len().to_string();
        let live = live.to_string();
        log_event_with_fields(
            Event::StoreOpened,
            &[
                ("schema", schema.name.as_str()),
                ("slots", total.as_str()),
                ("live", live.as_str()),
            ],
        );

        Ok(Self {
            schema,
            slots: RwLock::new(slots),
            locks: LockTable::new(),
            allocation: Mutex::new(()),
            persistence,
            policy,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(StoreMetrics::new()),
        })
    }

    /// Evaluate the modification policy against `clock` instead of wall time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // Every write to the table is a single push or replace, so the table
    // stays consistent even if a writer panicked.
    fn slots_read(&self) -> RwLockReadGuard<'_, SlotTable> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots_write(&self) -> RwLockWriteGuard<'_, SlotTable> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================
    // Record operations
    // ==================

    /// Current live record in `slot`
    pub fn read(&self, slot: SlotId) -> StoreResult<Arc<Record>> {
        self.slots_read()
            .get(slot as usize)
            .and_then(|entry| entry.as_ref())
            .filter(|record| !record.is_deleted())
            .cloned()
            .ok_or(StoreError::NotFound(slot))
    }

    /// Write `fields` as a new record.
    ///
    /// Reuses the lowest free slot (tombstoned or never written) before
    /// appending. A reused tombstone continues its version sequence so a
    /// version seen before the delete can never match the new record.
    /// Duplicate field content is allowed.
    pub fn create(&self, fields: Vec<FieldValue>) -> StoreResult<SlotId> {
        SchemaValidator::new(&self.schema).validate_fields(&fields)?;

        let _allocation = self.allocation.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, version) = {
            let slots = self.slots_read();
            let free = slots
                .iter()
                .position(|entry| entry.as_ref().map_or(true, |record| record.is_deleted()));
            match free {
                Some(index) => {
                    let version = slots[index]
                        .as_ref()
                        .map_or(INITIAL_VERSION, |tombstone| tombstone.version() + 1);
                    (index as SlotId, version)
                }
                None => (slots.len() as SlotId, INITIAL_VERSION),
            }
        };

        self.write_through(Record::new(slot, fields, version))?;
        self.metrics.increment_creates();

        let slot_str = slot.to_string();
        let version_str = version.to_string();
        log_event_with_fields(
            Event::RecordCreated,
            &[("slot", slot_str.as_str()), ("version", version_str.as_str())],
        );
        Ok(slot)
    }

    /// Replace the record in `slot` with `fields`. Returns the new version.
    ///
    /// `session` must hold the slot lock and `expected_version` must be the
    /// current version.
    pub fn update(
        &self,
        slot: SlotId,
        session: SessionId,
        fields: Vec<FieldValue>,
        expected_version: u64,
    ) -> StoreResult<u64> {
        let current = self.checked_for_change(slot, session, expected_version)?;
        SchemaValidator::new(&self.schema).validate_update(current.fields(), &fields)?;

        let next = current.successor(fields);
        let version = next.version();
        self.write_through(next)?;
        self.metrics.increment_updates();

        let slot_str = slot.to_string();
        let version_str = version.to_string();
        log_event_with_fields(
            Event::RecordUpdated,
            &[("slot", slot_str.as_str()), ("version", version_str.as_str())],
        );
        Ok(version)
    }

    /// Tombstone the record in `slot`. Same preconditions as `update`.
    /// Returns the tombstone's version.
    pub fn delete(&self, slot: SlotId, session: SessionId, expected_version: u64) -> StoreResult<u64> {
        let current = self.checked_for_change(slot, session, expected_version)?;

        let tombstone = current.tombstoned();
        let version = tombstone.version();
        self.write_through(tombstone)?;
        self.metrics.increment_deletes();

        let slot_str = slot.to_string();
        let version_str = version.to_string();
        log_event_with_fields(
            Event::RecordDeleted,
            &[("slot", slot_str.as_str()), ("version", version_str.as_str())],
        );
        Ok(version)
    }

    fn checked_for_change(&self, slot: SlotId, session: SessionId, expected: u64) -> StoreResult<Arc<Record>> {
        if !self.locks.is_held_by(slot, session) {
            let err = LockError::NotHolder {
                slot,
                session,
                holder: self.locks.holder(slot),
            };
            report_violation(&err);
            return Err(err.into());
        }

        let current = self.read(slot)?;
        let slot_str = slot.to_string();

        if current.version() != expected {
            self.metrics.increment_stale_rejections();
            let expected_str = expected.to_string();
            let current_str = current.version().to_string();
            log_event_at(
                Severity::Warn,
                Event::UpdateStale,
                &[
                    ("slot", slot_str.as_str()),
                    ("expected", expected_str.as_str()),
                    ("current", current_str.as_str()),
                ],
            );
            return Err(StoreError::Stale {
                slot,
                expected,
                current: current.version(),
            });
        }

        if !self.policy.is_modifiable(current.fields(), self.clock.now()) {
            self.metrics.increment_policy_rejections();
            log_event_at(Severity::Warn, Event::UpdateNotModifiable, &[("slot", slot_str.as_str())]);
            return Err(StoreError::NotModifiable(slot));
        }

        Ok(current)
    }

    fn write_through(&self, record: Record) -> StoreResult<()> {
        if let Err(e) = self.persistence.persist(&record) {
            self.metrics.increment_persist_failures();
            let slot = record.slot().to_string();
            let message = e.to_string();
            let severity = if e.is_fatal() { Severity::Fatal } else { Severity::Error };
            log_event_at(
                severity,
                Event::PersistFailed,
                &[("slot", slot.as_str()), ("error", message.as_str())],
            );
            return Err(e.into());
        }

        let index = record.slot() as usize;
        let mut slots = self.slots_write();
        if index >= slots.len() {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(Arc::new(record));
        Ok(())
    }

    // ==================
    // Locking
    // ==================

    /// Block until `slot` is free, then hold it for `session` until
    /// `unlock`.
    pub fn lock(&self, slot: SlotId, session: SessionId) -> StoreResult<()> {
        self.lock_scoped(slot, session).map(SlotGuard::detach).map(|_| ())
    }

    /// Lock `slot` for the lifetime of the returned guard.
    ///
    /// Fails with `NotFound` if the slot is not live (checked again after
    /// the wait) and with `LockViolation` if `session` already holds any
    /// slot.
    pub fn lock_scoped(&self, slot: SlotId, session: SessionId) -> StoreResult<SlotGuard<'_>> {
        if let Some(held) = self.locks.held_by(session) {
            let err = LockError::AlreadyHolding { slot, session, held };
            report_violation(&err);
            return Err(err.into());
        }

        self.read(slot)?;
        let guard = self.locks.acquire_scoped(slot, session);
        self.metrics.record_lock(guard.waited());

        // Deleted while we waited; the guard gives the lock back
        self.read(slot)?;

        let slot_str = slot.to_string();
        let session_str = session.to_string();
        log_event_at(
            Severity::Trace,
            Event::LockAcquired,
            &[("slot", slot_str.as_str()), ("session", session_str.as_str())],
        );
        Ok(guard)
    }

    /// Release `slot`. Fails with `LockViolation` unless `session` holds it.
    pub fn unlock(&self, slot: SlotId, session: SessionId) -> StoreResult<()> {
        if let Err(err) = self.locks.release(slot, session) {
            report_violation(&err);
            return Err(err.into());
        }

        let slot_str = slot.to_string();
        let session_str = session.to_string();
        log_event_at(
            Severity::Trace,
            Event::LockReleased,
            &[("slot", slot_str.as_str()), ("session", session_str.as_str())],
        );
        Ok(())
    }

    /// Drop every lock `session` holds. Used when a session disconnects.
    pub fn release_all(&self, session: SessionId) -> Vec<SlotId> {
        self.locks.release_all(session)
    }

    /// Session currently holding `slot`
    pub fn lock_holder(&self, slot: SlotId) -> Option<SessionId> {
        self.locks.holder(slot)
    }

    /// Slot currently locked by `session`
    pub fn held_by(&self, session: SessionId) -> Option<SlotId> {
        self.locks.held_by(session)
    }

    // ==================
    // Accessors
    // ==================

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn policy(&self) -> &Arc<dyn ModificationPolicy> {
        &self.policy
    }

    /// Policy description for clients
    pub fn policy_config(&self) -> PolicyConfig {
        self.policy.describe()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether the policy currently allows changing `record`
    pub fn is_modifiable(&self, record: &Record) -> bool {
        !record.is_deleted() && self.policy.is_modifiable(record.fields(), self.clock.now())
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Live records in slot order, as of one instant
    pub fn snapshot(&self) -> Vec<Arc<Record>> {
        self.slots_read()
            .iter()
            .flatten()
            .filter(|record| !record.is_deleted())
            .cloned()
            .collect()
    }

    /// Highest slot number ever written, plus one
    pub fn slot_count(&self) -> usize {
        self.slots_read().len()
    }

    pub fn live_count(&self) -> usize {
        self.slots_read().iter().flatten().filter(|r| !r.is_deleted()).count()
    }
}

fn report_violation(err: &LockError) {
    let slot = err.slot().to_string();
    let message = err.to_string();
    log_event_with_fields(
        Event::LockViolation,
        &[("slot", slot.as_str()), ("error", message.as_str())],
    );
}
