//! Observable events for slotdb
//!
//! Events are explicit and typed. Each maps to one stable log name.

use std::fmt;

/// Observable events in slotdb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded
    ConfigLoaded,
    /// Record store opened from persistence
    StoreOpened,
    /// Data directory initialized
    DataDirInitialized,
    /// TCP server bound and accepting
    ServerListening,
    /// Client connection ended with an I/O error
    ConnectionFailed,
    /// Shutdown complete
    ShutdownComplete,

    // Sessions
    /// Session joined
    SessionRegistered,
    /// Session left
    SessionUnregistered,
    /// Lock released on behalf of a departing session
    SessionLockReclaimed,

    // Record writes
    /// New record written to a slot
    RecordCreated,
    /// Record replaced with a new version
    RecordUpdated,
    /// Record tombstoned
    RecordDeleted,

    // Locking
    /// Slot lock granted
    LockAcquired,
    /// Slot lock released
    LockReleased,
    /// Unlock or nested lock by the wrong session (FATAL)
    LockViolation,

    // Rejections
    /// Update/delete carried an old version
    UpdateStale,
    /// Modification policy refused the change
    UpdateNotModifiable,
    /// Write-through to storage failed
    PersistFailed,
    /// Storage file failed verification (FATAL)
    StorageCorruption,

    // Queries
    /// Query matched and stored for paging
    QueryExecuted,
    /// Query criteria rejected
    QueryRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",
            Event::DataDirInitialized => "DATA_DIR_INITIALIZED",
            Event::ServerListening => "SERVER_LISTENING",
            Event::ConnectionFailed => "CONNECTION_FAILED",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::SessionRegistered => "SESSION_REGISTERED",
            Event::SessionUnregistered => "SESSION_UNREGISTERED",
            Event::SessionLockReclaimed => "SESSION_LOCK_RECLAIMED",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",

            Event::LockAcquired => "LOCK_ACQUIRED",
            Event::LockReleased => "LOCK_RELEASED",
            Event::LockViolation => "LOCK_VIOLATION",

            Event::UpdateStale => "UPDATE_STALE",
            Event::UpdateNotModifiable => "UPDATE_NOT_MODIFIABLE",
            Event::PersistFailed => "PERSIST_FAILED",
            Event::StorageCorruption => "STORAGE_CORRUPTION",

            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
        }
    }

    /// Returns true if this event indicates a broken invariant
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::LockViolation | Event::StorageCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
