//! API request types
//!
//! One JSON object per line, dispatched on `op`. Field values travel as
//! their string forms; criteria map field names to match strings.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::errors::{ApiError, ApiResult};
use crate::record::SlotId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Schema,
    Policy,
    Create { fields: Vec<String> },
    Read { slot: SlotId },
    Lock { slot: SlotId },
    Unlock { slot: SlotId },
    Update { slot: SlotId, fields: Vec<String> },
    Delete { slot: SlotId },
    Modify { slot: SlotId, fields: Vec<String> },
    Remove { slot: SlotId },
    Query {
        criteria: BTreeMap<String, String>,
        only_modifiable: bool,
    },
    NextPage,
    Stats,
}

/// Raw request for parsing
#[derive(Debug, Deserialize)]
struct RawRequest {
    op: String,
    #[serde(default)]
    slot: Option<SlotId>,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    criteria: Option<BTreeMap<String, String>>,
    #[serde(default)]
    only_modifiable: bool,
}

impl RawRequest {
    fn slot(&self) -> ApiResult<SlotId> {
        self.slot.ok_or_else(|| ApiError::invalid_request("Missing slot"))
    }

    fn fields(&mut self) -> ApiResult<Vec<String>> {
        self.fields.take().ok_or_else(|| ApiError::invalid_request("Missing fields"))
    }
}

impl Request {
    /// Parse a request from one JSON line
    pub fn parse(json: &str) -> ApiResult<Self> {
        let mut raw: RawRequest =
            serde_json::from_str(json).map_err(|e| ApiError::invalid_request(format!("Invalid JSON: {}", e)))?;

        let request = match raw.op.as_str() {
            "schema" => Request::Schema,
            "policy" => Request::Policy,
            "create" => Request::Create { fields: raw.fields()? },
            "read" => Request::Read { slot: raw.slot()? },
            "lock" => Request::Lock { slot: raw.slot()? },
            "unlock" => Request::Unlock { slot: raw.slot()? },
            "update" => Request::Update {
                slot: raw.slot()?,
                fields: raw.fields()?,
            },
            "delete" => Request::Delete { slot: raw.slot()? },
            "modify" => Request::Modify {
                slot: raw.slot()?,
                fields: raw.fields()?,
            },
            "remove" => Request::Remove { slot: raw.slot()? },
            "query" => Request::Query {
                criteria: raw.criteria.take().unwrap_or_default(),
                only_modifiable: raw.only_modifiable,
            },
            "next_page" => Request::NextPage,
            "stats" => Request::Stats,
            other => return Err(ApiError::unknown_operation(other)),
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update() {
        let req = Request::parse(r#"{"op":"update","slot":3,"fields":["Palace","1234"]}"#).unwrap();
        assert_eq!(
            req,
            Request::Update {
                slot: 3,
                fields: vec!["Palace".into(), "1234".into()]
            }
        );
    }

    #[test]
    fn test_parse_query_defaults() {
        let req = Request::parse(r#"{"op":"query"}"#).unwrap();
        assert_eq!(
            req,
            Request::Query {
                criteria: BTreeMap::new(),
                only_modifiable: false
            }
        );

        let req = Request::parse(r#"{"op":"query","criteria":{"name":"Pal"},"only_modifiable":true}"#).unwrap();
        match req {
            Request::Query {
                criteria,
                only_modifiable,
            } => {
                assert_eq!(criteria.get("name").map(String::as_str), Some("Pal"));
                assert!(only_modifiable);
            }
            other => panic!("Expected query, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_slot() {
        let err = Request::parse(r#"{"op":"lock"}"#).unwrap_err();
        assert_eq!(err.code(), "API_INVALID_REQUEST");
        assert!(err.message().contains("slot"));
    }

    #[test]
    fn test_unknown_operation() {
        let err = Request::parse(r#"{"op":"truncate"}"#).unwrap_err();
        assert_eq!(err.code(), "API_UNKNOWN_OPERATION");
    }

    #[test]
    fn test_invalid_json() {
        assert!(Request::parse("{not json").is_err());
    }
}
