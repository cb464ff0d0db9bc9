//! Sessions
//!
//! One session per connected client. Sessions own result sets and
//! observed versions, never references into the store.

mod coordinator;
mod id;

pub use coordinator::{SessionCoordinator, SessionInfo, DEFAULT_PAGE_SIZE};
pub use id::SessionId;
