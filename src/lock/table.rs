//! Per-slot lock table
//!
//! An entry present in `holders` means the slot is locked by that session;
//! an absent entry means unlocked. At most one holder per slot.
//!
//! `acquire` is the only blocking call in the store. It parks the calling
//! thread on a condition variable until the current holder releases. There
//! is no timeout: a holder that never releases blocks waiters forever.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::errors::{LockError, LockResult};
use super::guard::SlotGuard;
use crate::record::SlotId;
use crate::session::SessionId;

/// Blocking per-slot mutual exclusion keyed by slot number
#[derive(Debug, Default)]
pub struct LockTable {
    holders: Mutex<HashMap<SlotId, SessionId>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section below leaves the map consistent, so a panic in
    // another thread while holding the mutex does not invalidate it.
    fn holders(&self) -> MutexGuard<'_, HashMap<SlotId, SessionId>> {
        self.holders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `slot` is free, then record `session` as its holder.
    ///
    /// Returns `true` if the caller had to wait for another holder.
    pub fn acquire(&self, slot: SlotId, session: SessionId) -> bool {
        let mut holders = self.holders();
        let mut waited = false;

        while holders.contains_key(&slot) {
            waited = true;
            holders = self
                .released
                .wait(holders)
                .unwrap_or_else(PoisonError::into_inner);
        }

        holders.insert(slot, session);
        waited
    }

    /// Acquire with release tied to the returned guard's lifetime
    pub fn acquire_scoped(&self, slot: SlotId, session: SessionId) -> SlotGuard<'_> {
        let waited = self.acquire(slot, session);
        SlotGuard::new(self, slot, session, waited)
    }

    /// Release `slot`. Fails if `session` is not the current holder.
    pub fn release(&self, slot: SlotId, session: SessionId) -> LockResult<()> {
        let mut holders = self.holders();
        let holder = holders.get(&slot).copied();

        if holder != Some(session) {
            return Err(LockError::NotHolder {
                slot,
                session,
                holder,
            });
        }

        holders.remove(&slot);
        drop(holders);
        self.released.notify_all();
        Ok(())
    }

    /// Release every slot held by `session`, returning the slots freed
    pub fn release_all(&self, session: SessionId) -> Vec<SlotId> {
        let mut holders = self.holders();
        let mut freed: Vec<SlotId> = holders
            .iter()
            .filter(|(_, holder)| **holder == session)
            .map(|(slot, _)| *slot)
            .collect();

        for slot in &freed {
            holders.remove(slot);
        }
        drop(holders);

        if !freed.is_empty() {
            self.released.notify_all();
        }
        freed.sort_unstable();
        freed
    }

    /// Current holder of `slot`, if any
    pub fn holder(&self, slot: SlotId) -> Option<SessionId> {
        self.holders().get(&slot).copied()
    }

    pub fn is_held_by(&self, slot: SlotId, session: SessionId) -> bool {
        self.holder(slot) == Some(session)
    }

    /// Slot currently held by `session`, if any
    pub fn held_by(&self, session: SessionId) -> Option<SlotId> {
        self.holders()
            .iter()
            .find(|(_, holder)| **holder == session)
            .map(|(slot, _)| *slot)
    }

    /// Number of slots currently locked
    pub fn locked_count(&self) -> usize {
        self.holders().len()
    }
}
