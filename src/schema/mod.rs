//! Schema subsystem for slotdb
//!
//! The schema is an ordered list of field descriptors supplied once when the
//! store opens and immutable afterwards.
//!
//! # Design Principles
//!
//! - Closed set of field types
//! - Validation before persistence
//! - Violations reject the write, never coerce

mod errors;
mod loader;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use loader::SchemaLoader;
pub use types::{FieldDef, FieldType, Schema};
pub use validator::SchemaValidator;
