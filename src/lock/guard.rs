//! Scoped slot lock
//!
//! A `SlotGuard` releases its slot when dropped, so every exit path of the
//! scope that took it (early return, `?`, panic unwinding) gives the lock
//! back.

use super::errors::LockResult;
use super::table::LockTable;
use crate::observability::{log_event_with_fields, Event};
use crate::record::SlotId;
use crate::session::SessionId;

/// Holds one slot lock for the lifetime of a scope
#[must_use = "dropping the guard releases the slot lock immediately"]
pub struct SlotGuard<'a> {
    table: &'a LockTable,
    slot: SlotId,
    session: SessionId,
    waited: bool,
    released: bool,
}

impl<'a> SlotGuard<'a> {
    pub(super) fn new(table: &'a LockTable, slot: SlotId, session: SessionId, waited: bool) -> Self {
        Self {
            table,
            slot,
            session,
            waited,
            released: false,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether acquisition had to wait for another holder
    pub fn waited(&self) -> bool {
        self.waited
    }

    /// Keep the lock past this scope. The caller becomes responsible for
    /// an explicit `LockTable::release`.
    pub fn detach(mut self) -> SlotId {
        self.released = true;
        self.slot
    }

    /// Release now and report a contract violation instead of swallowing it
    pub fn release(mut self) -> LockResult<()> {
        self.released = true;
        self.table.release(self.slot, self.session)
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.table.release(self.slot, self.session) {
            let slot = self.slot.to_string();
            let message = e.to_string();
            log_event_with_fields(Event::LockViolation, &[("slot", slot.as_str()), ("error", message.as_str())]);
        }
    }
}
