//! Immutable slot records
//!
//! A change never mutates a `Record`; it produces a successor with the next
//! version, which replaces the old value in the store as a whole.

use super::value::FieldValue;

/// Stable integer identity of a record within the store
pub type SlotId = u32;

/// First version of a record written to a never-used slot
pub const INITIAL_VERSION: u64 = 1;

/// One generation of the record held in a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    slot: SlotId,
    fields: Vec<FieldValue>,
    deleted: bool,
    version: u64,
}

impl Record {
    /// A live record
    pub fn new(slot: SlotId, fields: Vec<FieldValue>, version: u64) -> Self {
        Self {
            slot,
            fields,
            deleted: false,
            version,
        }
    }

    /// A tombstone. Fields are kept as last written.
    pub fn tombstone(slot: SlotId, fields: Vec<FieldValue>, version: u64) -> Self {
        Self {
            slot,
            fields,
            deleted: true,
            version,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Live successor carrying `fields` at the next version
    pub fn successor(&self, fields: Vec<FieldValue>) -> Self {
        Self::new(self.slot, fields, self.version + 1)
    }

    /// Tombstone successor at the next version
    pub fn tombstoned(&self) -> Self {
        Self::tombstone(self.slot, self.fields.clone(), self.version + 1)
    }

    /// String forms of all fields in column order
    pub fn string_forms(&self) -> Vec<String> {
        self.fields.iter().map(FieldValue::to_string_form).collect()
    }
}
