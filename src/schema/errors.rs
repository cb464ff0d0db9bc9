//! Schema error types
//!
//! Error codes:
//! - SCHEMA_MALFORMED (FATAL)
//! - SCHEMA_VALIDATION_FAILED (REJECT)
//! - SCHEMA_VALUE_INVALID (REJECT)
//! - SCHEMA_FIELD_IMMUTABLE (REJECT)
//! - SCHEMA_CRITERIA_INVALID (REJECT)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// The store cannot open with this schema
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema definition itself is invalid
    SchemaMalformed,
    /// Record fields do not fit the schema
    ValidationFailed,
    /// String form cannot be parsed for the field type
    ValueInvalid,
    /// Update changes a non-modifiable field
    FieldImmutable,
    /// Search criteria do not fit the schema
    CriteriaInvalid,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::SchemaMalformed => "SCHEMA_MALFORMED",
            SchemaErrorCode::ValidationFailed => "SCHEMA_VALIDATION_FAILED",
            SchemaErrorCode::ValueInvalid => "SCHEMA_VALUE_INVALID",
            SchemaErrorCode::FieldImmutable => "SCHEMA_FIELD_IMMUTABLE",
            SchemaErrorCode::CriteriaInvalid => "SCHEMA_CRITERIA_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::SchemaMalformed => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field name, or `$record` for whole-record problems
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn field_count(expected: usize, actual: usize) -> Self {
        Self::new("$record", format!("{} fields", expected), format!("{} fields", actual))
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        Self::new(field, format!("at most {} characters", max), format!("{} characters", actual))
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Schema error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    details: Option<ValidationDetails>,
}

impl SchemaError {
    /// Create an error for a malformed schema definition
    pub fn malformed_schema(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::SchemaMalformed,
            message: format!("Malformed schema '{}': {}", source.into(), reason.into()),
            details: None,
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(details: ValidationDetails) -> Self {
        Self {
            code: SchemaErrorCode::ValidationFailed,
            message: format!("Record validation failed: {}", details),
            details: Some(details),
        }
    }

    /// Create an unparsable value error
    pub fn value_invalid(field: impl Into<String>, type_name: &str, raw: impl Into<String>) -> Self {
        let details = ValidationDetails::type_mismatch(field, type_name, format!("'{}'", raw.into()));
        Self {
            code: SchemaErrorCode::ValueInvalid,
            message: format!("Invalid value: {}", details),
            details: Some(details),
        }
    }

    /// Create an error for a change to a non-modifiable field
    pub fn field_immutable(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            code: SchemaErrorCode::FieldImmutable,
            message: format!("Field '{}' cannot be modified", field),
            details: Some(ValidationDetails::new(field, "unchanged value", "changed value")),
        }
    }

    /// Create an invalid criteria error
    pub fn criteria_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::CriteriaInvalid,
            message: format!("Invalid criteria: {}", reason.into()),
            details: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::SchemaMalformed.code(), "SCHEMA_MALFORMED");
        assert_eq!(SchemaErrorCode::ValidationFailed.code(), "SCHEMA_VALIDATION_FAILED");
        assert_eq!(SchemaErrorCode::ValueInvalid.code(), "SCHEMA_VALUE_INVALID");
        assert_eq!(SchemaErrorCode::FieldImmutable.code(), "SCHEMA_FIELD_IMMUTABLE");
        assert_eq!(SchemaErrorCode::CriteriaInvalid.code(), "SCHEMA_CRITERIA_INVALID");
    }

    #[test]
    fn test_only_malformed_is_fatal() {
        assert!(SchemaError::malformed_schema("x", "y").is_fatal());
        assert!(!SchemaError::field_immutable("name").is_fatal());
        assert!(!SchemaError::criteria_invalid("arity").is_fatal());
    }

    #[test]
    fn test_validation_details_display() {
        let err = SchemaError::validation_failed(ValidationDetails::too_long("owner", 8, 12));
        let display = format!("{}", err);
        assert!(display.contains("SCHEMA_VALIDATION_FAILED"));
        assert!(display.contains("owner"));
        assert!(display.contains("at most 8"));
    }
}
