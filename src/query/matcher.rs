//! Per-field matchers and search criteria
//!
//! Matching is fixed per field type: text columns match a case-insensitive
//! prefix, every other type matches exactly. A criteria vector holds one
//! optional matcher per schema column; absent columns accept anything.

use crate::record::{FieldValue, Record};
use crate::schema::{FieldDef, FieldType, Schema, SchemaError, SchemaResult};

/// Predicate over one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatcher {
    /// Case-insensitive prefix of a text value. Stored lowercased.
    Prefix(String),
    /// Exact equality with a typed value
    Exact(FieldValue),
}

impl FieldMatcher {
    pub fn prefix(prefix: impl AsRef<str>) -> Self {
        FieldMatcher::Prefix(prefix.as_ref().to_lowercase())
    }

    pub fn exact(value: FieldValue) -> Self {
        FieldMatcher::Exact(value)
    }

    /// Matcher for `field` built from a client-supplied string
    pub fn for_field(field: &FieldDef, raw: &str) -> SchemaResult<Self> {
        match field.field_type {
            FieldType::Text => Ok(Self::prefix(raw.trim())),
            _ => FieldValue::parse(field, raw).map(FieldMatcher::Exact),
        }
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        match self {
            FieldMatcher::Prefix(prefix) => value
                .as_text()
                .map_or(false, |text| text.to_lowercase().starts_with(prefix.as_str())),
            FieldMatcher::Exact(expected) => expected == value,
        }
    }

    fn accepts_type(&self, field_type: FieldType) -> bool {
        match self {
            FieldMatcher::Prefix(_) => field_type == FieldType::Text,
            FieldMatcher::Exact(value) => value.field_type() == field_type,
        }
    }
}

/// One optional matcher per schema column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    matchers: Vec<Option<FieldMatcher>>,
}

impl Criteria {
    /// Checks arity, searchability and matcher type against `schema`
    pub fn new(schema: &Schema, matchers: Vec<Option<FieldMatcher>>) -> SchemaResult<Self> {
        if matchers.len() != schema.field_count() {
            return Err(SchemaError::criteria_invalid(format!(
                "expected {} entries, got {}",
                schema.field_count(),
                matchers.len()
            )));
        }

        for (field, matcher) in schema.fields.iter().zip(&matchers) {
            let Some(matcher) = matcher else { continue };
            if !field.searchable {
                return Err(SchemaError::criteria_invalid(format!(
                    "field '{}' is not searchable",
                    field.name
                )));
            }
            if !matcher.accepts_type(field.field_type) {
                return Err(SchemaError::criteria_invalid(format!(
                    "matcher does not apply to {} field '{}'",
                    field.field_type.type_name(),
                    field.name
                )));
            }
        }

        Ok(Self { matchers })
    }

    /// Matches every live record
    pub fn any(schema: &Schema) -> Self {
        Self {
            matchers: vec![None; schema.field_count()],
        }
    }

    /// From positional string forms, `None` for unconstrained columns
    pub fn from_strings(schema: &Schema, raw: &[Option<String>]) -> SchemaResult<Self> {
        if raw.len() != schema.field_count() {
            return Err(SchemaError::criteria_invalid(format!(
                "expected {} entries, got {}",
                schema.field_count(),
                raw.len()
            )));
        }

        let matchers = schema
            .fields
            .iter()
            .zip(raw)
            .map(|(field, value)| value.as_deref().map(|v| FieldMatcher::for_field(field, v)).transpose())
            .collect::<SchemaResult<Vec<_>>>()?;

        Self::new(schema, matchers)
    }

    /// From `(field name, string form)` pairs
    pub fn by_name(schema: &Schema, pairs: &[(&str, &str)]) -> SchemaResult<Self> {
        let mut raw: Vec<Option<String>> = vec![None; schema.field_count()];
        for (name, value) in pairs {
            let index = schema
                .index_of(name)
                .ok_or_else(|| SchemaError::criteria_invalid(format!("unknown field '{}'", name)))?;
            raw[index] = Some((*value).to_string());
        }
        Self::from_strings(schema, &raw)
    }

    pub fn matchers(&self) -> &[Option<FieldMatcher>] {
        &self.matchers
    }

    pub fn arity(&self) -> usize {
        self.matchers.len()
    }

    /// True when no column is constrained
    pub fn is_unconstrained(&self) -> bool {
        self.matchers.iter().all(Option::is_none)
    }

    /// Every present matcher accepts its column of a live `record`
    pub fn matches(&self, record: &Record) -> bool {
        !record.is_deleted()
            && self
                .matchers
                .iter()
                .zip(record.fields())
                .all(|(matcher, value)| matcher.as_ref().map_or(true, |m| m.matches(value)))
    }
}
