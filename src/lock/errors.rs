//! Lock table errors
//!
//! Both variants mean a caller broke the locking contract. They are never
//! retried and are logged at FATAL where detected.

use thiserror::Error;

use crate::record::SlotId;
use crate::session::SessionId;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Locking contract violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Release attempted by a session that does not hold the slot
    #[error("session {session} does not hold the lock on slot {slot} (holder: {})", holder_name(.holder))]
    NotHolder {
        slot: SlotId,
        session: SessionId,
        holder: Option<SessionId>,
    },

    /// Acquire attempted while the session already holds a slot lock
    #[error("session {session} already holds the lock on slot {held}; cannot lock slot {slot}")]
    AlreadyHolding {
        slot: SlotId,
        session: SessionId,
        held: SlotId,
    },
}

fn holder_name(holder: &Option<SessionId>) -> String {
    match holder {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

impl LockError {
    /// Slot the violating call named
    pub fn slot(&self) -> SlotId {
        match self {
            LockError::NotHolder { slot, .. } => *slot,
            LockError::AlreadyHolding { slot, .. } => *slot,
        }
    }
}
