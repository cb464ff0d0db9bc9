//! Schema loader
//!
//! A schema is supplied once, when the store opens: from a JSON file, from
//! an inline JSON value (config), or programmatically. Malformed schemas are
//! FATAL because no record can be interpreted without one.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;

/// Loads and structurally validates schemas
pub struct SchemaLoader;

impl SchemaLoader {
    /// Load a schema from a JSON file
    pub fn load_file(path: &Path) -> SchemaResult<Schema> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let schema: Schema = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        Self::check(schema, &path.display().to_string())
    }

    /// Load a schema from an already-parsed JSON value
    pub fn from_value(value: &Value) -> SchemaResult<Schema> {
        let schema: Schema = serde_json::from_value(value.clone())
            .map_err(|e| SchemaError::malformed_schema("<inline>", format!("Invalid JSON: {}", e)))?;

        Self::check(schema, "<inline>")
    }

    /// Validate a programmatically built schema
    pub fn register(schema: Schema) -> SchemaResult<Schema> {
        Self::check(schema, "<in-memory>")
    }

    fn check(schema: Schema, source: &str) -> SchemaResult<Schema> {
        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed_schema(source, e))?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{"name":"people","fields":[{"name":"name","type":"text","max_length":32}]}"#,
        )
        .unwrap();

        let schema = SchemaLoader::load_file(&path).unwrap();
        assert_eq!(schema.name, "people");
        assert_eq!(schema.fields[0].field_type, FieldType::Text);
        assert_eq!(schema.fields[0].max_length, Some(32));
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = SchemaLoader::load_file(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_value_rejects_unknown_type() {
        let value = json!({"name": "x", "fields": [{"name": "a", "type": "blob"}]});
        assert!(SchemaLoader::from_value(&value).is_err());
    }

    #[test]
    fn test_from_value_rejects_empty_schema() {
        let value = json!({"name": "x", "fields": []});
        let err = SchemaLoader::from_value(&value).unwrap_err();
        assert!(err.message().contains("at least one field"));
    }
}
