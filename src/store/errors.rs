//! Record store errors
//!
//! Error codes:
//! - SLOT_NOT_FOUND (REJECT)
//! - SLOT_STALE (REJECT)
//! - SLOT_NOT_MODIFIABLE (REJECT)
//! - SLOT_UNKNOWN_SESSION (REJECT)
//! - SCHEMA_* (REJECT, from the wrapped schema error)
//! - SLOT_PERSISTENCE_FAILURE (ERROR)
//! - SLOT_LOCK_VIOLATION (FATAL)

use std::fmt;

use thiserror::Error;

use crate::lock::LockError;
use crate::record::SlotId;
use crate::schema::SchemaError;
use crate::session::SessionId;
use crate::storage::StorageError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Severity of a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected outcome; the caller retries with fresh data or tells the user
    Reject,
    /// The write did not happen; in-memory state is unchanged
    Error,
    /// Broken caller contract
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Slot unused, tombstoned, or never existed
    #[error("slot {0} not found")]
    NotFound(SlotId),

    /// Caller's remembered version no longer matches
    #[error("slot {slot} is stale: expected version {expected}, current version {current}")]
    Stale {
        slot: SlotId,
        expected: u64,
        current: u64,
    },

    /// Modification policy refused the change
    #[error("slot {0} can no longer be modified")]
    NotModifiable(SlotId),

    #[error("lock violation: {0}")]
    LockViolation(#[from] LockError),

    /// Write-through failed; nothing was applied
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StorageError),

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] SchemaError),

    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

impl StoreError {
    /// Stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "SLOT_NOT_FOUND",
            StoreError::Stale { .. } => "SLOT_STALE",
            StoreError::NotModifiable(_) => "SLOT_NOT_MODIFIABLE",
            StoreError::LockViolation(_) => "SLOT_LOCK_VIOLATION",
            StoreError::PersistenceFailure(_) => "SLOT_PERSISTENCE_FAILURE",
            StoreError::InvalidRecord(e) => e.code().code(),
            StoreError::UnknownSession(_) => "SLOT_UNKNOWN_SESSION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StoreError::LockViolation(_) => Severity::Fatal,
            StoreError::PersistenceFailure(_) => Severity::Error,
            _ => Severity::Reject,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Whether retrying with fresh data can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::Stale { .. } | StoreError::NotModifiable(_)
        )
    }
}
