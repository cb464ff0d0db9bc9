//! Field values and their string forms
//!
//! One variant per `FieldType`. Parsing and formatting are a closed match
//! on the variant; there is no runtime type registry.

use std::fmt;

use chrono::NaiveDate;

use crate::schema::{FieldDef, FieldType, SchemaError, SchemaResult};

/// Date string form, e.g. `2026/10/19`
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// A single column value. Values are immutable and totally ordered
/// within a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    /// Minor units (cents)
    Currency(i64),
    Flag(bool),
    Date(NaiveDate),
}

impl FieldValue {
    /// The schema type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Currency(_) => FieldType::Currency,
            FieldValue::Flag(_) => FieldType::Flag,
            FieldValue::Date(_) => FieldType::Date,
        }
    }

    /// Parse the string form of a value for `field`.
    ///
    /// Surrounding whitespace is ignored. Length limits are checked by the
    /// validator, not here.
    pub fn parse(field: &FieldDef, raw: &str) -> SchemaResult<Self> {
        let trimmed = raw.trim();
        let invalid = || SchemaError::value_invalid(&field.name, field.field_type.type_name(), raw);

        match field.field_type {
            FieldType::Text => Ok(FieldValue::Text(trimmed.to_string())),
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid()),
            FieldType::Currency => parse_currency(trimmed)
                .map(FieldValue::Currency)
                .ok_or_else(invalid),
            FieldType::Flag => match trimmed {
                "Y" | "y" => Ok(FieldValue::Flag(true)),
                "N" | "n" => Ok(FieldValue::Flag(false)),
                _ => Err(invalid()),
            },
            FieldType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| invalid()),
        }
    }

    /// Decode a string form exactly as it was stored. Unlike `parse`, text
    /// keeps its surrounding whitespace.
    pub fn decode(field: &FieldDef, raw: &str) -> SchemaResult<Self> {
        match field.field_type {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            _ => Self::parse(field, raw),
        }
    }

    /// Parse a full row of client-supplied string forms
    pub fn parse_row(fields: &[FieldDef], raw: &[String]) -> SchemaResult<Vec<FieldValue>> {
        map_row(fields, raw, Self::parse)
    }

    /// Decode a full row of stored string forms
    pub fn decode_row(fields: &[FieldDef], raw: &[String]) -> SchemaResult<Vec<FieldValue>> {
        map_row(fields, raw, Self::decode)
    }

    /// The string form, as clients and the slot file see it
    pub fn to_string_form(&self) -> String {
        self.to_string()
    }

    /// Text payload, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date payload, if this is a date value
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

fn map_row(
    fields: &[FieldDef],
    raw: &[String],
    convert: fn(&FieldDef, &str) -> SchemaResult<FieldValue>,
) -> SchemaResult<Vec<FieldValue>> {
    if fields.len() != raw.len() {
        return Err(SchemaError::validation_failed(
            crate::schema::ValidationDetails::field_count(fields.len(), raw.len()),
        ));
    }
    fields
        .iter()
        .zip(raw)
        .map(|(field, value)| convert(field, value))
        .collect()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Currency(cents) => {
                let sign = if *cents < 0 { "-" } else { "" };
                let abs = cents.unsigned_abs();
                write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
            }
            FieldValue::Flag(true) => write!(f, "Y"),
            FieldValue::Flag(false) => write!(f, "N"),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

/// `$150.00`, `150`, `-$1.5` -> minor units
fn parse_currency(s: &str) -> Option<i64> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    let (whole, frac) = rest.split_once('.').unwrap_or((rest, ""));

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let total = whole.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(field_type: FieldType) -> FieldDef {
        FieldDef::new("f", field_type)
    }

    #[test]
    fn test_parse_text_trims() {
        let value = FieldValue::parse(&def(FieldType::Text), "  Palace  ").unwrap();
        assert_eq!(value, FieldValue::Text("Palace".into()));
    }

    #[test]
    fn test_decode_text_keeps_whitespace() {
        let value = FieldValue::decode(&def(FieldType::Text), "  Palace ").unwrap();
        assert_eq!(value, FieldValue::Text("  Palace ".into()));

        let row = FieldValue::decode_row(
            &[def(FieldType::Text), def(FieldType::Integer)],
            &[" a".to_string(), "4".to_string()],
        )
        .unwrap();
        assert_eq!(row, vec![FieldValue::Text(" a".into()), FieldValue::Integer(4)]);
    }

    #[test]
    fn test_parse_currency_forms() {
        let currency = def(FieldType::Currency);
        assert_eq!(FieldValue::parse(&currency, "$150.00").unwrap(), FieldValue::Currency(15000));
        assert_eq!(FieldValue::parse(&currency, "150").unwrap(), FieldValue::Currency(15000));
        assert_eq!(FieldValue::parse(&currency, "$9.5").unwrap(), FieldValue::Currency(950));
        assert_eq!(FieldValue::parse(&currency, "-$1.05").unwrap(), FieldValue::Currency(-105));
        assert!(FieldValue::parse(&currency, "$1.005").is_err());
        assert!(FieldValue::parse(&currency, "$").is_err());
        assert!(FieldValue::parse(&currency, "ten").is_err());
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(FieldValue::Currency(15000).to_string(), "$150.00");
        assert_eq!(FieldValue::Currency(7).to_string(), "$0.07");
        assert_eq!(FieldValue::Currency(-105).to_string(), "-$1.05");
    }

    #[test]
    fn test_parse_flag() {
        let flag = def(FieldType::Flag);
        assert_eq!(FieldValue::parse(&flag, "Y").unwrap(), FieldValue::Flag(true));
        assert_eq!(FieldValue::parse(&flag, "n").unwrap(), FieldValue::Flag(false));
        assert!(FieldValue::parse(&flag, "yes").is_err());
    }

    #[test]
    fn test_parse_date() {
        let value = FieldValue::parse(&def(FieldType::Date), "2026/10/19").unwrap();
        assert_eq!(value.as_date(), NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(value.to_string(), "2026/10/19");
        assert!(FieldValue::parse(&def(FieldType::Date), "2026-10-19").is_err());
    }

    #[test]
    fn test_parse_integer_error_names_field() {
        let err = FieldValue::parse(&FieldDef::new("size", FieldType::Integer), "big").unwrap_err();
        assert_eq!(err.details().unwrap().field, "size");
    }

    #[test]
    fn test_parse_row_checks_arity() {
        let fields = vec![def(FieldType::Text), def(FieldType::Integer)];
        assert!(FieldValue::parse_row(&fields, &["a".into()]).is_err());
        let row = FieldValue::parse_row(&fields, &["a".into(), "4".into()]).unwrap();
        assert_eq!(row[1], FieldValue::Integer(4));
    }

    #[test]
    fn test_values_ordered_within_variant() {
        assert!(FieldValue::Integer(2) < FieldValue::Integer(10));
        assert!(FieldValue::Text("Alpha".into()) < FieldValue::Text("Beta".into()));
    }
}
