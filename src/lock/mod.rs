//! Slot locking for slotdb
//!
//! # Invariants
//!
//! - At most one session holds a slot's lock at any instant
//! - Only the holder may release
//! - Call sites take at most one slot lock and release it as soon as the
//!   update/delete it guards completes; locks are never nested and never
//!   held across a query

mod errors;
mod guard;
mod table;

pub use errors::{LockError, LockResult};
pub use guard::SlotGuard;
pub use table::LockTable;
