//! Record values
//!
//! - `FieldValue`: one closed variant per schema field type
//! - `Record`: immutable (slot, fields, deleted, version) value

mod slot;
mod value;

pub use slot::{Record, SlotId, INITIAL_VERSION};
pub use value::{FieldValue, DATE_FORMAT};
