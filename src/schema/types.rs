//! Schema type definitions
//!
//! Supported field types:
//! - text: UTF-8 string, searched by case-insensitive prefix
//! - integer: 64-bit signed integer
//! - currency: amount in minor units, string form `$150.00`
//! - flag: boolean, string form `Y` / `N`
//! - date: calendar date, string form `YYYY/MM/DD`

use serde::{Deserialize, Serialize};

/// Closed set of field types. Parsing, formatting and matching are
/// resolved per variant (see `record::FieldValue` and `query::FieldMatcher`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    Text,
    /// 64-bit signed integer
    Integer,
    /// Monetary amount in minor units (cents)
    Currency,
    /// Yes/no flag
    Flag,
    /// Calendar date without time of day
    Date,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Currency => "currency",
            FieldType::Flag => "flag",
            FieldType::Date => "date",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Field descriptor: name, type and presentation hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name, unique within the schema
    pub name: String,
    /// Value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether clients may put a criterion on this column
    #[serde(default = "default_true")]
    pub searchable: bool,
    /// Whether clients should show this column
    #[serde(default = "default_true")]
    pub displayable: bool,
    /// Whether an update may change this column
    #[serde(default = "default_true")]
    pub modifiable: bool,
    /// Maximum length of the string form, if bounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FieldDef {
    /// Create a searchable, displayable, modifiable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            searchable: true,
            displayable: true,
            modifiable: true,
            max_length: None,
        }
    }

    /// Bound the length of the string form
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Mark the field as fixed once written
    pub fn read_only(mut self) -> Self {
        self.modifiable = false;
        self
    }

    /// Exclude the field from search criteria
    pub fn unsearchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    /// Hide the field from clients
    pub fn hidden(mut self) -> Self {
        self.displayable = false;
        self
    }
}

/// Ordered field descriptors, fixed when the store opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Human-readable schema name
    pub name: String,
    /// Field descriptors in column order
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Create a new schema
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Number of columns every live record carries
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Descriptor at `index`
    pub fn field(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    /// Column index of the field called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("Schema must define at least one field".into());
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(format!("Field {} has an empty name", i));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("Duplicate field name '{}'", field.name));
            }
            if field.max_length == Some(0) {
                return Err(format!("Field '{}' has max_length 0", field.name));
            }
        }

        Ok(())
    }

    /// Sample hotel room schema. Only `owner` may change after creation.
    pub fn hotel_rooms() -> Self {
        Self::new(
            "hotel_rooms",
            vec![
                FieldDef::new("name", FieldType::Text).with_max_length(64).read_only(),
                FieldDef::new("location", FieldType::Text).with_max_length(64).read_only(),
                FieldDef::new("size", FieldType::Integer).with_max_length(4).read_only().unsearchable(),
                FieldDef::new("smoking", FieldType::Flag).with_max_length(1).read_only().unsearchable(),
                FieldDef::new("rate", FieldType::Currency).with_max_length(8).read_only().unsearchable(),
                FieldDef::new("date", FieldType::Date).with_max_length(10).read_only().unsearchable(),
                FieldDef::new("owner", FieldType::Text).with_max_length(8).unsearchable(),
            ],
        )
    }
}
