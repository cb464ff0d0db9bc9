//! Query engine
//!
//! Per-column matchers, a criteria vector, and the find/verify pair the
//! session coordinator uses to build result sets.

mod engine;
mod matcher;

pub use engine::QueryEngine;
pub use matcher::{Criteria, FieldMatcher};
