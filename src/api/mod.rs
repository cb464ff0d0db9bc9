//! JSON line protocol
//!
//! # Supported Operations
//!
//! - schema, policy
//! - create, read
//! - lock, unlock, update, delete
//! - modify, remove (lock/change/unlock in one call)
//! - query, next_page
//! - stats

mod errors;
mod handler;
mod request;
mod response;

pub use errors::{ApiError, ApiErrorCode, ApiResult, Severity};
pub use handler::SessionHandler;
pub use request::Request;
pub use response::{ErrorResponse, RecordView, Response, SuccessResponse};
