//! Record store subsystem
//!
//! Owns every record, the slot lock table and version generation.
//!
//! # Invariants
//!
//! - At most one session holds a slot's lock at any instant
//! - Every accepted update/delete raises the slot's version by exactly one
//! - Update/delete require the caller's lock and its current version
//! - Nothing becomes visible unless it was persisted first

mod errors;
mod persistence;
mod record_store;

pub use errors::{Severity, StoreError, StoreResult};
pub use persistence::{MemoryPersistence, Persistence};
pub use record_store::RecordStore;
