//! slotdb - a shared record store with per-slot locking
//!
//! Records live in numbered slots. Clients lock a slot, update or delete it
//! against the version they last saw, and unlock it. Deleted slots are
//! reused by later creates. Queries run as find (snapshot scan) plus
//! verify (re-check against the live record), and results are paged per
//! session.

pub mod api;
pub mod cli;
pub mod lock;
pub mod observability;
pub mod policy;
pub mod query;
pub mod record;
pub mod schema;
pub mod server;
pub mod session;
pub mod storage;
pub mod store;
