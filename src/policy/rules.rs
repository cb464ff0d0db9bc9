//! Modification policy predicates
//!
//! The store consults the policy before every update/delete and, when asked,
//! while filtering query results. It never inspects the rule itself.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::FieldValue;
use crate::schema::{FieldType, Schema, SchemaError, SchemaResult};

/// Pluggable gate deciding whether a record may currently change
pub trait ModificationPolicy: Send + Sync + fmt::Debug {
    /// Whether a record with `fields` may be changed at instant `now`
    fn is_modifiable(&self, fields: &[FieldValue], now: DateTime<Utc>) -> bool;

    /// Serializable description handed to clients
    fn describe(&self) -> PolicyConfig;
}

/// Declarative policy description, as found in config files and sent to
/// clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// Every record may always change
    Unrestricted,
    /// Records become fixed once the date in `field` is within `lead_hours`
    LeadTime { field: String, lead_hours: i64 },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::Unrestricted
    }
}

impl PolicyConfig {
    /// Resolve field names against `schema` and build the predicate
    pub fn build(&self, schema: &Schema) -> SchemaResult<Arc<dyn ModificationPolicy>> {
        match self {
            PolicyConfig::Unrestricted => Ok(Arc::new(Unrestricted)),
            PolicyConfig::LeadTime { field, lead_hours } => {
                let index = schema.index_of(field).ok_or_else(|| {
                    SchemaError::malformed_schema(&schema.name, format!("policy field '{}' does not exist", field))
                })?;
                if schema.fields[index].field_type != FieldType::Date {
                    return Err(SchemaError::malformed_schema(
                        &schema.name,
                        format!("policy field '{}' is not a date", field),
                    ));
                }
                if *lead_hours < 0 {
                    return Err(SchemaError::malformed_schema(&schema.name, "policy lead_hours must be >= 0"));
                }
                let lead = Duration::try_hours(*lead_hours)
                    .ok_or_else(|| SchemaError::malformed_schema(&schema.name, "policy lead_hours out of range"))?;
                Ok(Arc::new(LeadTimePolicy::new(field.clone(), index, lead)))
            }
        }
    }
}

/// Allows every change
#[derive(Debug, Default, Clone, Copy)]
pub struct Unrestricted;

impl ModificationPolicy for Unrestricted {
    fn is_modifiable(&self, _fields: &[FieldValue], _now: DateTime<Utc>) -> bool {
        true
    }

    fn describe(&self) -> PolicyConfig {
        PolicyConfig::Unrestricted
    }
}

/// A record tied to an event date is fixed once the event starts within
/// `lead` of `now`. Events already in the past are fixed too.
///
/// The event instant is midnight UTC at the start of the date.
#[derive(Debug, Clone)]
pub struct LeadTimePolicy {
    field_name: String,
    field_index: usize,
    lead: Duration,
}

impl LeadTimePolicy {
    pub fn new(field_name: impl Into<String>, field_index: usize, lead: Duration) -> Self {
        Self {
            field_name: field_name.into(),
            field_index,
            lead,
        }
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }
}

impl ModificationPolicy for LeadTimePolicy {
    fn is_modifiable(&self, fields: &[FieldValue], now: DateTime<Utc>) -> bool {
        let date = match fields.get(self.field_index).and_then(FieldValue::as_date) {
            Some(date) => date,
            // Not an event-bound record
            None => return true,
        };

        let event_start = date.and_time(NaiveTime::MIN).and_utc();
        event_start - now > self.lead
    }

    fn describe(&self) -> PolicyConfig {
        PolicyConfig::LeadTime {
            field: self.field_name.clone(),
            lead_hours: self.lead.num_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn event(y: i32, m: u32, d: u32) -> Vec<FieldValue> {
        vec![
            FieldValue::Text("Palace".into()),
            FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
        ]
    }

    fn policy() -> LeadTimePolicy {
        LeadTimePolicy::new("date", 1, Duration::hours(48))
    }

    #[test]
    fn test_far_future_event_is_modifiable() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(policy().is_modifiable(&event(2026, 10, 25), now));
    }

    #[test]
    fn test_event_within_lead_is_fixed() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        // Starts 36h from now
        assert!(!policy().is_modifiable(&event(2026, 10, 21), now));
    }

    #[test]
    fn test_boundary_is_fixed() {
        // Exactly 48h ahead
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert!(!policy().is_modifiable(&event(2026, 10, 21), now));
        let earlier = now - Duration::seconds(1);
        assert!(policy().is_modifiable(&event(2026, 10, 21), earlier));
    }

    #[test]
    fn test_past_event_is_fixed() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(!policy().is_modifiable(&event(2026, 1, 1), now));
    }

    #[test]
    fn test_build_lead_time_from_config() {
        let schema = Schema::hotel_rooms();
        let config: PolicyConfig =
            serde_json::from_str(r#"{"kind":"lead_time","field":"date","lead_hours":48}"#).unwrap();
        let policy = config.build(&schema).unwrap();
        assert_eq!(policy.describe(), config);
    }

    #[test]
    fn test_build_rejects_non_date_field() {
        let schema = Schema::hotel_rooms();
        let config = PolicyConfig::LeadTime {
            field: "owner".into(),
            lead_hours: 48,
        };
        assert!(config.build(&schema).is_err());
    }

    #[test]
    fn test_build_rejects_oversized_lead() {
        let config = PolicyConfig::LeadTime {
            field: "date".into(),
            lead_hours: i64::MAX,
        };
        let err = config.build(&Schema::hotel_rooms()).err().unwrap();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_unrestricted_is_default() {
        let config = PolicyConfig::default();
        let policy = config.build(&Schema::hotel_rooms()).unwrap();
        assert!(policy.is_modifiable(&[], Utc::now()));
    }
}
