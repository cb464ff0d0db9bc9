//! Record validation against the store schema
//!
//! Validation semantics:
//! - Exactly one value per schema field, in column order
//! - Each value's variant matches the field type
//! - String forms respect `max_length`
//! - On update, non-modifiable fields keep their current value
//!
//! No coercion and no defaults. The validator never mutates a record.

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::Schema;
use crate::record::FieldValue;

/// Schema validator bound to the store schema
pub struct SchemaValidator<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validates a full row of values for create or update
    pub fn validate_fields(&self, values: &[FieldValue]) -> SchemaResult<()> {
        if values.len() != self.schema.field_count() {
            return Err(SchemaError::validation_failed(ValidationDetails::field_count(
                self.schema.field_count(),
                values.len(),
            )));
        }

        for (field, value) in self.schema.fields.iter().zip(values) {
            if value.field_type() != field.field_type {
                return Err(SchemaError::validation_failed(ValidationDetails::type_mismatch(
                    &field.name,
                    field.field_type.type_name(),
                    value.field_type().type_name(),
                )));
            }

            if let Some(max) = field.max_length {
                let len = value.to_string_form().chars().count();
                if len > max {
                    return Err(SchemaError::validation_failed(ValidationDetails::too_long(
                        &field.name,
                        max,
                        len,
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validates a replacement row against the current one
    pub fn validate_update(&self, current: &[FieldValue], proposed: &[FieldValue]) -> SchemaResult<()> {
        self.validate_fields(proposed)?;

        for ((field, old), new) in self.schema.fields.iter().zip(current).zip(proposed) {
            if !field.modifiable && old != new {
                return Err(SchemaError::field_immutable(&field.name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, SchemaErrorCode};

    fn schema() -> Schema {
        Schema::new(
            "test",
            vec![
                FieldDef::new("name", FieldType::Text).with_max_length(5).read_only(),
                FieldDef::new("size", FieldType::Integer),
            ],
        )
    }

    fn row(name: &str, size: i64) -> Vec<FieldValue> {
        vec![FieldValue::Text(name.into()), FieldValue::Integer(size)]
    }

    #[test]
    fn test_valid_row() {
        let schema = schema();
        assert!(SchemaValidator::new(&schema).validate_fields(&row("Alpha", 2)).is_ok());
    }

    #[test]
    fn test_wrong_arity() {
        let schema = schema();
        let err = SchemaValidator::new(&schema)
            .validate_fields(&[FieldValue::Text("a".into())])
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ValidationFailed);
    }

    #[test]
    fn test_type_mismatch() {
        let schema = schema();
        let err = SchemaValidator::new(&schema)
            .validate_fields(&[FieldValue::Integer(1), FieldValue::Integer(2)])
            .unwrap_err();
        assert_eq!(err.details().unwrap().field, "name");
    }

    #[test]
    fn test_max_length_counts_characters() {
        let schema = schema();
        let validator = SchemaValidator::new(&schema);
        assert!(validator.validate_fields(&row("Ölçüm", 1)).is_ok());
        assert!(validator.validate_fields(&row("Alphas", 1)).is_err());
    }

    #[test]
    fn test_update_rejects_read_only_change() {
        let schema = schema();
        let validator = SchemaValidator::new(&schema);
        let err = validator.validate_update(&row("Alpha", 1), &row("Beta", 1)).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::FieldImmutable);
        assert!(validator.validate_update(&row("Alpha", 1), &row("Alpha", 9)).is_ok());
    }
}
